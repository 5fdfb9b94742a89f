mod base;
mod ctrl;
mod object;

pub use base::{ActivationQuery, PreviewQuery, SearchQuery};
pub use ctrl::QueryCtrl;
pub(crate) use ctrl::QueryCtrlServant;
pub use object::QueryServant;
pub(crate) use object::QueryKind;
