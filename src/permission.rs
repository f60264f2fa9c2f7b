//! Permission engine: pure POSIX-style `rwx` evaluation, matching
//! `Fam_Metadata_Service_Direct::Impl_::metadata_check_permissions`.

/// Bitwise-combinable requested operation. `OWNER_ALLOW` short-circuits
/// to granted when `uid == meta.uid`, without evaluating mode bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Op(u32);

impl Op {
    pub const READ: Op = Op(0b0001);
    pub const WRITE: Op = Op(0b0010);
    pub const EXEC: Op = Op(0b0100);
    pub const OWNER_ALLOW: Op = Op(0b1000);

    pub fn contains(self, other: Op) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Op {
    type Output = Op;
    fn bitor(self, rhs: Op) -> Op {
        Op(self.0 | rhs.0)
    }
}

const S_IRUSR: u32 = 0o400;
const S_IWUSR: u32 = 0o200;
const S_IXUSR: u32 = 0o100;
const S_IRGRP: u32 = 0o040;
const S_IWGRP: u32 = 0o020;
const S_IXGRP: u32 = 0o010;
const S_IROTH: u32 = 0o004;
const S_IWOTH: u32 = 0o002;
const S_IXOTH: u32 = 0o001;

/// Minimal view over the fields `check` needs, implemented for both
/// `RegionMeta` and `DataItemMeta`.
pub trait PermissionSubject {
    fn uid(&self) -> u32;
    fn gid(&self) -> u32;
    fn perm(&self) -> u32;
}

impl PermissionSubject for crate::name_directory::RegionMeta {
    fn uid(&self) -> u32 {
        self.uid
    }
    fn gid(&self) -> u32 {
        self.gid
    }
    fn perm(&self) -> u32 {
        self.perm
    }
}

impl PermissionSubject for crate::name_directory::DataItemMeta {
    fn uid(&self) -> u32 {
        self.uid
    }
    fn gid(&self) -> u32 {
        self.gid
    }
    fn perm(&self) -> u32 {
        self.perm
    }
}

/// Returns true iff every requested bit in `op` is granted by at least
/// one applicable class (owner/group/other), walked exactly as POSIX
/// does. `Op::OWNER_ALLOW` short-circuits to true when `uid == meta.uid`.
pub fn check<S: PermissionSubject>(meta: &S, op: Op, uid: u32, gid: u32) -> bool {
    if op.contains(Op::OWNER_ALLOW) && uid == meta.uid() {
        return true;
    }

    let mut read = false;
    let mut write = false;
    let mut exec = false;

    if uid == meta.uid() {
        write |= meta.perm() & S_IWUSR != 0;
        read |= meta.perm() & S_IRUSR != 0;
        exec |= meta.perm() & S_IXUSR != 0;
    }
    if gid == meta.gid() {
        write |= meta.perm() & S_IWGRP != 0;
        read |= meta.perm() & S_IRGRP != 0;
        exec |= meta.perm() & S_IXGRP != 0;
    }
    write |= meta.perm() & S_IWOTH != 0;
    read |= meta.perm() & S_IROTH != 0;
    exec |= meta.perm() & S_IXOTH != 0;

    (!op.contains(Op::WRITE) || write)
        && (!op.contains(Op::READ) || read)
        && (!op.contains(Op::EXEC) || exec)
}
