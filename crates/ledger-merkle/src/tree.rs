//! Merkle tree construction and proof generation/verification.
//!
//! Leaf hash: `H(0x00 ‖ event_hash_string_bytes)`. Internal hash: `H(0x01 ‖
//! left ‖ right)`, left before right, so proof verification depends on leaf
//! index parity. The two domain-separation prefixes prevent an internal
//! node's preimage from also being a valid leaf (and vice versa).

use ledger_types::hash::get_hasher;

use crate::error::{MerkleError, MerkleResult};

const LEAF_PREFIX: u8 = 0x00;
const INTERNAL_PREFIX: u8 = 0x01;

fn leaf_hash(algorithm: &str, event_hash: &str) -> MerkleResult<[u8; 32]> {
    let hasher = get_hasher(algorithm).map_err(|_| MerkleError::UnsupportedAlgorithm(algorithm.to_string()))?;
    let mut bytes = vec![LEAF_PREFIX];
    bytes.extend_from_slice(event_hash.as_bytes());
    Ok(hasher.hash(&bytes))
}

fn internal_hash(algorithm: &str, left: &[u8; 32], right: &[u8; 32]) -> MerkleResult<[u8; 32]> {
    let hasher = get_hasher(algorithm).map_err(|_| MerkleError::UnsupportedAlgorithm(algorithm.to_string()))?;
    let mut bytes = vec![INTERNAL_PREFIX];
    bytes.extend_from_slice(left);
    bytes.extend_from_slice(right);
    Ok(hasher.hash(&bytes))
}

fn next_power_of_two(n: usize) -> usize {
    if n <= 1 {
        1
    } else {
        n.next_power_of_two()
    }
}

/// A built Merkle tree: every level from leaves to root, for O(1) proof
/// generation against any leaf index.
pub struct MerkleTree {
    algorithm: String,
    levels: Vec<Vec<[u8; 32]>>,
    leaf_count: usize,
}

impl MerkleTree {
    /// Builds a tree over `event_hashes` in order. Pads to the next power of
    /// two by duplicating the last leaf. Empty input yields a tree whose
    /// [`root`] is the sentinel `"<algo>:empty"`.
    pub fn build(algorithm: &str, event_hashes: &[String]) -> MerkleResult<Self> {
        if event_hashes.is_empty() {
            return Ok(Self {
                algorithm: algorithm.to_string(),
                levels: Vec::new(),
                leaf_count: 0,
            });
        }

        let mut leaves: Vec<[u8; 32]> = event_hashes
            .iter()
            .map(|h| leaf_hash(algorithm, h))
            .collect::<MerkleResult<Vec<_>>>()?;

        let padded = next_power_of_two(leaves.len());
        if let Some(&last) = leaves.last() {
            while leaves.len() < padded {
                leaves.push(last);
            }
        }

        let mut levels = vec![leaves];
        while levels.last().unwrap().len() > 1 {
            let current = levels.last().unwrap();
            let mut next = Vec::with_capacity(current.len() / 2);
            for pair in current.chunks(2) {
                next.push(internal_hash(algorithm, &pair[0], &pair[1])?);
            }
            levels.push(next);
        }

        Ok(Self {
            algorithm: algorithm.to_string(),
            levels,
            leaf_count: event_hashes.len(),
        })
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Tagged root hash, or `"<algo>:empty"` for an empty tree.
    pub fn root(&self) -> String {
        match self.levels.last() {
            Some(top) => format!("{}:{}", self.algorithm, hex::encode(top[0])),
            None => format!("{}:empty", self.algorithm),
        }
    }

    /// Sibling path from leaf `index` to the root, ordered leaf-to-root.
    pub fn proof(&self, index: usize) -> MerkleResult<Vec<String>> {
        if self.leaf_count == 0 || index >= self.leaf_count {
            return Err(MerkleError::LeafIndexOutOfBounds { index, leaf_count: self.leaf_count });
        }

        let mut path = Vec::new();
        let mut i = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = i ^ 1;
            let sibling = sibling.min(level.len() - 1);
            path.push(format!("{}:{}", self.algorithm, hex::encode(level[sibling])));
            i /= 2;
        }
        Ok(path)
    }
}

/// Recomputes a leaf hash from `event_hash`, walks `path` combining with each
/// sibling by the parity of the current index, and compares the result to
/// `root`. Pure — no I/O, no access to the tree that produced the proof.
pub fn verify_proof(
    algorithm: &str,
    event_hash: &str,
    leaf_index: usize,
    path: &[String],
    root: &str,
) -> MerkleResult<bool> {
    let mut current = leaf_hash(algorithm, event_hash)?;
    let mut i = leaf_index;

    for sibling_tagged in path {
        let sibling_hex = sibling_tagged
            .split_once(':')
            .map(|(_, hex)| hex)
            .unwrap_or(sibling_tagged.as_str());
        let mut sibling = [0u8; 32];
        let decoded = hex::decode(sibling_hex).map_err(|_| MerkleError::UnsupportedAlgorithm(algorithm.to_string()))?;
        if decoded.len() != 32 {
            return Ok(false);
        }
        sibling.copy_from_slice(&decoded);

        current = if i % 2 == 0 {
            internal_hash(algorithm, &current, &sibling)?
        } else {
            internal_hash(algorithm, &sibling, &current)?
        };
        i /= 2;
    }

    let computed_root = format!("{algorithm}:{}", hex::encode(current));
    Ok(computed_root == root)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hashes(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("blake3:{:064x}", i)).collect()
    }

    #[test]
    fn empty_tree_root_is_sentinel() {
        let tree = MerkleTree::build("blake3", &[]).unwrap();
        assert_eq!(tree.root(), "blake3:empty");
    }

    #[test]
    fn single_leaf_proof_round_trips() {
        let leaves = hashes(1);
        let tree = MerkleTree::build("blake3", &leaves).unwrap();
        let proof = tree.proof(0).unwrap();
        assert!(verify_proof("blake3", &leaves[0], 0, &proof, &tree.root()).unwrap());
    }

    #[test]
    fn five_leaf_tree_every_proof_verifies() {
        let leaves = hashes(5);
        let tree = MerkleTree::build("blake3", &leaves).unwrap();
        for (i, leaf) in leaves.iter().enumerate() {
            let proof = tree.proof(i).unwrap();
            assert!(verify_proof("blake3", leaf, i, &proof, &tree.root()).unwrap(), "leaf {i} failed");
        }
    }

    #[test]
    fn mutated_event_hash_fails_verification() {
        let leaves = hashes(4);
        let tree = MerkleTree::build("blake3", &leaves).unwrap();
        let proof = tree.proof(1).unwrap();
        assert!(!verify_proof("blake3", &leaves[2], 1, &proof, &tree.root()).unwrap());
    }

    #[test]
    fn wrong_leaf_index_fails_verification() {
        let leaves = hashes(4);
        let tree = MerkleTree::build("blake3", &leaves).unwrap();
        let proof = tree.proof(1).unwrap();
        assert!(!verify_proof("blake3", &leaves[1], 2, &proof, &tree.root()).unwrap());
    }

    #[test]
    fn tampered_root_fails_verification() {
        let leaves = hashes(3);
        let tree = MerkleTree::build("blake3", &leaves).unwrap();
        let proof = tree.proof(0).unwrap();
        let tampered_root = format!("blake3:{}", "f".repeat(64));
        assert!(!verify_proof("blake3", &leaves[0], 0, &proof, &tampered_root).unwrap());
    }

    #[test]
    fn out_of_bounds_index_rejected() {
        let tree = MerkleTree::build("blake3", &hashes(3)).unwrap();
        assert!(tree.proof(10).is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_hashes(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("blake3:{:064x}", i * 2 + 1)).collect()
    }

    proptest! {
        /// Every leaf's proof verifies against the tree's own root, for any
        /// leaf count from 1 to 200.
        #[test]
        fn every_proof_verifies_for_any_leaf_count(n in 1usize..200) {
            let leaves = arb_hashes(n);
            let tree = MerkleTree::build("blake3", &leaves).unwrap();
            for (i, leaf) in leaves.iter().enumerate() {
                let proof = tree.proof(i).unwrap();
                prop_assert!(verify_proof("blake3", leaf, i, &proof, &tree.root()).unwrap());
            }
        }

        /// Flipping a single leaf always changes the root (sensitivity).
        #[test]
        fn single_leaf_mutation_changes_root(n in 2usize..200, mutate_at in 0usize..199) {
            let mutate_at = mutate_at % n;
            let mut leaves = arb_hashes(n);
            let original_root = MerkleTree::build("blake3", &leaves).unwrap().root();

            leaves[mutate_at] = format!("blake3:{:064x}", (mutate_at + 1) * 9973);
            let mutated_root = MerkleTree::build("blake3", &leaves).unwrap().root();

            prop_assert_ne!(original_root, mutated_root);
        }
    }
}
