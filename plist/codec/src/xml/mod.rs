//! XML property list, as described by Apple's `PropertyList-1.0.dtd`.

pub mod de;
pub mod ser;
mod token;

pub(crate) const HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
    <!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" \"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">\n\
    <plist version=\"1.0\">\n";

pub(crate) const FOOTER: &str = "</plist>\n";

// Deeper values are written with the same indent.
pub(crate) const MAX_INDENT: usize = 8;
