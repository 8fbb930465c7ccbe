pub mod pick;
pub mod results;
pub mod state;
pub mod turn;
