#![no_main]

use clplayer_core::demultiplex::{NullStreamTracker, TsParser};
use clplayer_core::dlna::{HeadResponse, HeadResponseInfo, ServerCapabilities};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut parser = TsParser::new();
    let mut tracker = NullStreamTracker;
    parser.feed(&mut tracker, data);
    parser.flush(&mut tracker);

    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(response) = HeadResponse::parse(text) {
            let info = HeadResponseInfo::from_response(&response);
            let _ = ServerCapabilities::from_info(&info);
        }
    }
});
