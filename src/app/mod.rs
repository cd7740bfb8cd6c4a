//! Central state container: state snapshot, reducer, and the async portal
//! that drives them.

pub mod portal;
pub mod reducer;
pub mod state;

pub use portal::{ModalRequest, Portal};
pub use reducer::{reduce, Action, CustomerData, HealthDataPatch, ReducerOutput, UserPatch};
pub use state::{AppState, ModalContent, ModalState, Page};
