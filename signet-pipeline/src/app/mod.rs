pub mod reconcile;
pub mod signing;
