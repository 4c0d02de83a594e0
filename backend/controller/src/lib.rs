pub mod controller;
pub mod scan;
pub mod session;

pub use controller::{
    Collaborators, Controller, ControllerInput, ControllerOptions, CANNOT_ACCESS, NO_ACTIVE_PAGE,
    REMOTE_FAILED, SUMMARY_UNAVAILABLE,
};
pub use scan::{read_document, request_with_recovery, ScanSettings};
pub use session::Session;
