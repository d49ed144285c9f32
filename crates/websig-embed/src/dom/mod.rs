mod bindings;
mod page;

pub use bindings::WebSigEmbed;
pub use page::WebPage;
