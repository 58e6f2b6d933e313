#![no_main]

use dotdeps::metadata::AssemblyManifest;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = AssemblyManifest::from_mem(data.to_vec());
});
