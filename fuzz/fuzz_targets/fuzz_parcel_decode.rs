// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use parcel_rpc::parcel::{Kind, MessageParcel};

fuzz_target!(|data: &[u8]| {
    let Ok(mut parcel) = MessageParcel::from_bytes(data) else {
        return;
    };

    // Lenient readers must return defaults, never panic.
    let _ = parcel.read_interface_token();
    let _ = parcel.read_int();
    let _ = parcel.read_long();
    let _ = parcel.read_string();
    let _ = parcel.read_byte_array();
    let _ = parcel.read_short_array();
    let _ = parcel.read_double_array();
    let _ = parcel.read_string_array();
    let _ = parcel.read_value_array(Kind::Long);
    let _ = parcel.read_exception();

    // Handle lookups against an empty object table.
    let _ = parcel.read_remote_object();
    let _ = parcel.read_file_descriptor();
    let _ = parcel.read_ashmem();
    let _ = parcel.read_raw_data(16);

    // Strict readers from the start.
    parcel.rewind_read(0);
    let _ = parcel.try_read_string_array();
    let _ = parcel.try_read_long_array();
});
