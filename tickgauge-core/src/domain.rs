//! The per-tick execution model
//!
//! Every stage in the pipeline is an independently clocked synchronous
//! component: all updates for a tick are computed from start-of-tick state
//! and commit together when `step` returns. There is no partial-tick
//! visibility and no blocking - a stage produces a defined output on every
//! tick it is stepped.
//!
//! Keep the trait simple: one input bundle in, one output bundle out, and a
//! way back to the power-on state.

/// A synchronous component advanced one tick at a time.
pub trait Synchronous {
    /// Everything the component samples this tick.
    type Input;
    /// Everything the component drives this tick.
    type Output;

    /// Advance one tick. State observed is start-of-tick state; all updates
    /// commit by the time this returns.
    fn step(&mut self, input: Self::Input) -> Self::Output;

    /// Return to the power-on state.
    fn reset(&mut self);
}
