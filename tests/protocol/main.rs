//! Tests that drive `GuessAndCheck::run_global` directly with a scripted
//! worker pool, without the `minimize_global` runner in between.

mod driver;
mod pool;
mod violations;
