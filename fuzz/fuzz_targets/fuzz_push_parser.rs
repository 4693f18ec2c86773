#![no_main]

use feedperf::backend::event_tree::parse_document;
use feedperf::backend::PushParser;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // First byte picks the chunk size, the rest is the document
    let Some((&size, document)) = data.split_first() else {
        return;
    };
    let chunk_size = usize::from(size).max(1);

    // Malformed input must end in an error, never a panic
    let mut parser = PushParser::new();
    let mut pushed = Vec::new();
    let mut push_ok = true;
    for chunk in document.chunks(chunk_size) {
        if parser.feed(chunk, false, |item| pushed.push(item)).is_err() {
            push_ok = false;
            break;
        }
    }
    if push_ok && parser.finish(|item| pushed.push(item)).is_err() {
        push_ok = false;
    }

    let mut tree = Vec::new();
    let tree_ok = parse_document(document, |item| tree.push(item)).is_ok();

    // Both backends accept a well-formed document and agree on its items
    if push_ok && tree_ok {
        assert_eq!(pushed, tree);
    }
});
