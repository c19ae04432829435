use terramap_core::{ChunkCoords, ChunkHashRecord, ContentHash, SmallKeyHashMap};

/// The other side's view of which chunks exist and what they hash to.
pub type HashManifest = SmallKeyHashMap<ChunkCoords, ContentHash>;

pub fn manifest_of(records: impl IntoIterator<Item = ChunkHashRecord>) -> HashManifest {
    records
        .into_iter()
        .map(|r| (r.coords, r.content_hash))
        .collect()
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ManifestDiff {
    /// Local chunks the remote side has never seen.
    pub new: Vec<ChunkCoords>,
    /// Local chunks the remote side holds with a different hash.
    pub changed: Vec<ChunkCoords>,
}

impl ManifestDiff {
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.changed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.new.len() + self.changed.len()
    }

    pub fn into_transfer_set(self) -> Vec<ChunkCoords> {
        let mut coords = self.new;
        coords.extend(self.changed);
        coords
    }
}

/// Splits `local` into chunks `remote` lacks and chunks whose hashes disagree. Chunks with equal hashes on both sides are
/// never part of the result. Remote-only chunks are ignored: the sender cannot provide them.
pub fn diff_manifests(local: &[ChunkHashRecord], remote: &HashManifest) -> ManifestDiff {
    let mut diff = ManifestDiff::default();
    for record in local {
        match remote.get(&record.coords) {
            None => diff.new.push(record.coords),
            Some(hash) if *hash != record.content_hash => diff.changed.push(record.coords),
            Some(_) => {}
        }
    }
    diff
}

/// `{c in local : c not in remote or hash_local(c) != hash_remote(c)}`, in `local` order with duplicates removed.
pub fn transfer_set(local: &[ChunkHashRecord], remote: &HashManifest) -> Vec<ChunkCoords> {
    let mut seen = terramap_core::SmallKeyHashSet::default();
    local
        .iter()
        .filter(|r| remote.get(&r.coords) != Some(&r.content_hash))
        .map(|r| r.coords)
        .filter(|c| seen.insert(*c))
        .collect()
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
