//! Pluggable file classification.

use serde::{Deserialize, Serialize};

/// Class and MIME type recorded for a file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub class: String,
    pub mime: String,
}

/// Derives a [`Classification`] for a file from its name.
pub trait Classifier: Send + Sync {
    fn classify(&self, name: &str) -> Classification;
}

/// Classifies by file extension using the `mime_guess` tables.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExtensionClassifier;

impl ExtensionClassifier {
    fn class_for(mime: &mime_guess::Mime) -> &'static str {
        match (mime.type_().as_str(), mime.subtype().as_str()) {
            ("image", _) => "image",
            ("audio", _) => "audio",
            ("video", _) => "video",
            ("text", _) => "text",
            ("application", "pdf") => "pdf",
            ("application", "zip" | "gzip" | "x-tar" | "x-7z-compressed" | "x-rar-compressed") => {
                "document"
            }
            ("application", sub)
                if sub.starts_with("vnd.openxmlformats")
                    || sub.starts_with("vnd.oasis.opendocument")
                    || sub == "msword"
                    || sub == "rtf" =>
            {
                "document"
            }
            _ => "files",
        }
    }
}

impl Classifier for ExtensionClassifier {
    fn classify(&self, name: &str) -> Classification {
        let mime = mime_guess::from_path(name).first_or_octet_stream();
        Classification {
            class: Self::class_for(&mime).to_string(),
            mime: mime.essence_str().to_string(),
        }
    }
}
