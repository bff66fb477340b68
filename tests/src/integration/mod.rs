//! Scenario tests over simulated clusters.

mod agreement;
mod catch_up;
mod membership;
