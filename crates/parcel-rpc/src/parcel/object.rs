// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object table: remote handles, file descriptors and shared memory carried
//! alongside the flat buffer.
//!
//! The buffer only stores `marker, index` pairs. The index points into the
//! parcel's object table, which keeps the referenced object alive for as long
//! as the parcel (or a clone of it) exists.

use super::error::{ParcelError, ParcelResult};
use super::{fill_into, MessageParcel, Primitive};
use crate::ashmem::Ashmem;
use crate::config::{ASHMEM_MARKER, BINDER_MARKER, FD_MARKER, MAX_OBJECT_ARRAY_LEN};
use crate::remote::{IRemoteObject, RemoteProxy, StubCore};
use std::io;
use std::os::fd::{AsFd, OwnedFd};
use std::sync::Arc;

/// Entry of a parcel's object table.
#[derive(Clone)]
pub(crate) enum ParcelObject {
    Binder(Arc<StubCore>),
    Fd(Arc<OwnedFd>),
    Ashmem(Arc<Ashmem>),
}

impl ParcelObject {
    fn marker(&self) -> i32 {
        match self {
            Self::Binder(_) => BINDER_MARKER,
            Self::Fd(_) => FD_MARKER,
            Self::Ashmem(_) => ASHMEM_MARKER,
        }
    }
}

impl MessageParcel {
    fn push_object(&mut self, object: ParcelObject) -> ParcelResult<()> {
        let index = self.objects.len() as i32;
        let marker = object.marker();
        self.atomic_write(|p| {
            marker.put(&mut p.buffer)?;
            index.put(&mut p.buffer)?;
            p.objects.push(object);
            Ok(())
        })
    }

    // Consume a `marker, index` pair and return the table entry. Callers wrap
    // this in `atomic_read` so a mismatch leaves the cursor untouched.
    fn try_take_object(&mut self, expected: i32) -> ParcelResult<ParcelObject> {
        let offset = self.buffer.read_position();
        let marker = i32::get(&mut self.buffer)?;
        let index = i32::get(&mut self.buffer)?;
        usize::try_from(index)
            .ok()
            .and_then(|i| self.objects.get(i))
            .filter(|o| marker == expected && o.marker() == expected)
            .cloned()
            .ok_or_else(|| ParcelError::ReadFailed {
                offset,
                reason: format!("no object with marker {:#x}", expected),
            })
    }

    fn take_object(&mut self, expected: i32) -> Option<ParcelObject> {
        self.atomic_read(|p| p.try_take_object(expected)).ok()
    }

    /// Object-table entries currently held.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    // ---------------------------------------------------------------------
    // Remote objects
    // ---------------------------------------------------------------------

    /// Embed a handle to `object`.
    ///
    /// Fails with `InvalidHandle` when the object has no live stub behind it
    /// (plain data, dead proxy) or an empty descriptor.
    pub fn write_remote_object(&mut self, object: &dyn IRemoteObject) -> ParcelResult<()> {
        let core = resolve_stub(object)?;
        self.push_object(ParcelObject::Binder(core))
    }

    /// Read back an embedded handle. Always a proxy, even when the stub lives
    /// in this process.
    pub fn read_remote_object(&mut self) -> Option<RemoteProxy> {
        match self.take_object(BINDER_MARKER)? {
            ParcelObject::Binder(core) => Some(RemoteProxy::from_core(&core)),
            _ => None,
        }
    }

    pub fn write_remote_object_array(
        &mut self,
        objects: &[&dyn IRemoteObject],
    ) -> ParcelResult<()> {
        if objects.len() > MAX_OBJECT_ARRAY_LEN {
            return Err(ParcelError::capacity(objects.len(), MAX_OBJECT_ARRAY_LEN));
        }
        let cores = objects
            .iter()
            .map(|o| resolve_stub(*o))
            .collect::<ParcelResult<Vec<_>>>()?;
        self.atomic_write(|p| {
            (cores.len() as i32).put(&mut p.buffer)?;
            for core in cores {
                p.push_object(ParcelObject::Binder(core))?;
            }
            Ok(())
        })
    }

    /// Read an array of handles.
    ///
    /// All or nothing: a short or corrupt array yields an empty vec and
    /// leaves the read cursor where it was.
    pub fn read_remote_object_array(&mut self) -> Vec<Option<RemoteProxy>> {
        self.atomic_read(|p| {
            let count = p.try_read_count(MAX_OBJECT_ARRAY_LEN)?;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                match p.try_take_object(BINDER_MARKER)? {
                    ParcelObject::Binder(core) => items.push(Some(RemoteProxy::from_core(&core))),
                    _ => items.push(None),
                }
            }
            Ok(items)
        })
        .unwrap_or_default()
    }

    pub fn read_remote_object_array_into(&mut self, out: &mut Vec<Option<RemoteProxy>>) {
        let items = self.read_remote_object_array();
        fill_into(out, items);
    }

    // ---------------------------------------------------------------------
    // File descriptors
    // ---------------------------------------------------------------------

    /// Embed a duplicate of `fd`. The caller keeps its own descriptor.
    pub fn write_file_descriptor(&mut self, fd: impl AsFd) -> ParcelResult<()> {
        let dup = fd.as_fd().try_clone_to_owned().map_err(|e| ParcelError::InvalidHandle(
            format!("cannot duplicate descriptor: {}", e),
        ))?;
        self.push_object(ParcelObject::Fd(Arc::new(dup)))
    }

    /// Read an embedded descriptor as a fresh duplicate owned by the caller.
    pub fn read_file_descriptor(&mut self) -> Option<OwnedFd> {
        match self.take_object(FD_MARKER)? {
            ParcelObject::Fd(fd) => match fd.try_clone() {
                Ok(dup) => Some(dup),
                Err(e) => {
                    log::warn!("[parcel] descriptor duplication failed: {}", e);
                    None
                }
            },
            _ => None,
        }
    }

    /// True when the object table holds descriptors or shared memory.
    pub fn contains_file_descriptors(&self) -> bool {
        self.objects
            .iter()
            .any(|o| matches!(o, ParcelObject::Fd(_) | ParcelObject::Ashmem(_)))
    }

    /// Duplicate any descriptor.
    pub fn dup_file_descriptor(fd: impl AsFd) -> io::Result<OwnedFd> {
        fd.as_fd().try_clone_to_owned()
    }

    /// Close a descriptor obtained from this parcel.
    pub fn close_file_descriptor(fd: OwnedFd) {
        drop(fd);
    }

    // ---------------------------------------------------------------------
    // Shared memory
    // ---------------------------------------------------------------------

    /// Embed a reference to `region`. Closed regions are refused.
    pub fn write_ashmem(&mut self, region: &Ashmem) -> ParcelResult<()> {
        let handle = Ashmem::from_existing(region)?;
        self.push_object(ParcelObject::Ashmem(Arc::new(handle)))
    }

    /// Read an embedded region as an independent, unmapped handle.
    pub fn read_ashmem(&mut self) -> Option<Ashmem> {
        match self.take_object(ASHMEM_MARKER)? {
            ParcelObject::Ashmem(region) => match Ashmem::from_existing(&region) {
                Ok(handle) => Some(handle),
                Err(e) => {
                    log::warn!("[parcel] cannot attach embedded ashmem: {}", e);
                    None
                }
            },
            _ => None,
        }
    }
}

fn resolve_stub(object: &dyn IRemoteObject) -> ParcelResult<Arc<StubCore>> {
    let core = object.stub_core().ok_or_else(|| {
        ParcelError::InvalidHandle(format!(
            "'{}' has no live stub behind it",
            object.descriptor()
        ))
    })?;
    if core.descriptor().is_empty() {
        return Err(ParcelError::InvalidHandle(
            "remote object has an empty descriptor".to_string(),
        ));
    }
    Ok(core)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Seek, SeekFrom, Write};

    #[test]
    fn test_file_descriptor_round_trip() {
        let mut file = tempfile::tempfile().expect("tempfile should succeed");
        file.write_all(b"fd payload").expect("write should succeed");

        let mut parcel = MessageParcel::new();
        parcel.write_file_descriptor(&file).expect("write should succeed");
        assert!(parcel.contains_file_descriptors());
        assert_eq!(parcel.size(), 8);

        let fd = parcel.read_file_descriptor().expect("descriptor should be present");
        let mut reopened = std::fs::File::from(fd);
        reopened.seek(SeekFrom::Start(0)).expect("seek should succeed");
        let mut content = String::new();
        reopened.read_to_string(&mut content).expect("read should succeed");
        assert_eq!(content, "fd payload");
    }

    #[test]
    fn test_marker_mismatch_leaves_cursor() {
        let mut parcel = MessageParcel::new();
        parcel.write_int(5).expect("write should succeed");
        parcel.write_int(0).expect("write should succeed");
        assert!(parcel.read_remote_object().is_none());
        assert!(parcel.read_file_descriptor().is_none());
        assert_eq!(parcel.read_position(), 0);
        assert_eq!(parcel.read_int(), 5);
    }

    #[test]
    fn test_short_handle_array_is_all_or_nothing() {
        let stub = crate::remote::RemoteObject::builder("test.parcel.short-array")
            .worker_threads(1)
            .build()
            .expect("stub should start");

        let mut parcel = MessageParcel::new();
        parcel.write_int(2).expect("write should succeed");
        parcel.write_remote_object(&stub).expect("write should succeed");
        parcel.write_int(7).expect("write should succeed");
        parcel.write_int(8).expect("write should succeed");

        assert!(parcel.read_remote_object_array().is_empty());
        assert_eq!(parcel.read_position(), 0);

        let mut out = vec![None, None];
        parcel.read_remote_object_array_into(&mut out);
        assert!(out.iter().all(Option::is_none));
        assert_eq!(parcel.read_position(), 0);

        let objects: [&dyn IRemoteObject; 2] = [&stub, &stub];
        let mut whole = MessageParcel::new();
        whole
            .write_remote_object_array(&objects)
            .expect("write should succeed");
        let proxies = whole.read_remote_object_array();
        assert_eq!(proxies.len(), 2);
        assert!(proxies.iter().all(Option::is_some));
        assert_eq!(whole.read_position(), whole.size());
    }

    #[test]
    fn test_ashmem_travels_unmapped() {
        let region = Ashmem::create("parcel-ashmem", 1024).expect("create should succeed");
        region.map_read_write().expect("map should succeed");
        region.write(b"shared", 0).expect("write should succeed");

        let mut parcel = MessageParcel::new();
        parcel.write_ashmem(&region).expect("write should succeed");
        assert!(parcel.contains_file_descriptors());

        let copy = parcel.read_ashmem().expect("ashmem should be present");
        assert!(!copy.is_mapped());
        assert_eq!(copy.size(), 1024);
        assert_eq!(copy.name(), "parcel-ashmem");
        copy.map_read_only().expect("map should succeed");
        assert_eq!(copy.read(6, 0).expect("read should succeed"), b"shared");

        region.close();
        assert!(matches!(
            parcel.write_ashmem(&region),
            Err(ParcelError::Ashmem(crate::ashmem::AshmemError::RegionClosed))
        ));
    }
}
