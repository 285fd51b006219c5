pub mod batch;
pub mod declaration;
pub mod loaders;
pub mod otp;
pub mod selectors;

pub use batch::{BatchPlan, DeclarationEntry, DeclarationRow};
pub use declaration::{
    Credentials, DeclarationCtx, DeclarationRequest, DeclarationResult, SavedDocument,
};
pub use loaders::load_batch_file;
pub use otp::{NotificationSnapshot, OtpCode};
pub use selectors::{PortalSelectors, Selector};
