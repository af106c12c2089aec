#![no_main]

use cadena::arch::ArchitectureDoc;
use cadena::model::Application;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Malformed documents must come back as errors, never panics, whatever
    // the declared callbacks, links and topics look like.
    if let Ok(doc) = serde_json::from_slice::<ArchitectureDoc>(data) {
        let _ = Application::from_architecture(&doc, &[]);
    }
});
