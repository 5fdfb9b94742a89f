mod object;
mod reply;

pub use object::ReplyObject;
pub use reply::{PreviewReply, SearchReply};
pub(crate) use reply::ReplyCore;
