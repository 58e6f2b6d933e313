#![no_main]

use dotdeps::sniffer::is_loadable_binary;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = is_loadable_binary(data);
});
