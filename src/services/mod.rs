pub mod access;
pub mod image;

pub use access::AccessGate;
pub use image::{ImageService, SweepReport, UploadRejection};
