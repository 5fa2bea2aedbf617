//! Merkle trees over record hashes
//!
//! Leaves are the 64-char hex record hashes used directly as strings.
//! Internal nodes hash the concatenation of the children's hex renderings
//! (not raw bytes); an odd final node at any level pairs with itself. Both
//! choices are fixed protocol: a raw-byte variant would be incompatible
//! with existing proof bundles.

use serde::{Deserialize, Serialize};

use crate::encoding;

/// Which side of the accumulating hash a proof sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SiblingPosition {
    #[serde(rename = "left")]
    Left,
    #[serde(rename = "right")]
    Right,
}

/// One step of an inclusion proof path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofStep {
    pub sibling_hash: String,
    pub position: SiblingPosition,
}

/// Inclusion proof from a leaf to a batch root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub leaf_hash: String,
    pub root_hash: String,
    pub proof_path: Vec<ProofStep>,
}

impl MerkleProof {
    /// Re-walk the path: the accumulated hash must land on the root.
    pub fn verify(&self) -> bool {
        let mut current = self.leaf_hash.clone();

        for step in &self.proof_path {
            current = match step.position {
                SiblingPosition::Left => parent_hash(&step.sibling_hash, &current),
                SiblingPosition::Right => parent_hash(&current, &step.sibling_hash),
            };
        }

        current == self.root_hash
    }
}

fn parent_hash(left: &str, right: &str) -> String {
    encoding::sha256_hex(format!("{}{}", left, right).as_bytes())
}

/// Merkle tree over a batch of leaf hashes, with every level retained so
/// proof generation is a straight index walk.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    levels: Vec<Vec<String>>,
}

impl MerkleTree {
    pub fn new(leaves: Vec<String>) -> Self {
        let mut levels = vec![leaves];

        while levels.last().map(|l| l.len() > 1).unwrap_or(false) {
            let current = levels.last().unwrap();
            let mut next = Vec::with_capacity((current.len() + 1) / 2);

            for pair in current.chunks(2) {
                let left = &pair[0];
                let right = pair.get(1).unwrap_or(left);
                next.push(parent_hash(left, right));
            }

            levels.push(next);
        }

        Self { levels }
    }

    pub fn leaves(&self) -> &[String] {
        &self.levels[0]
    }

    pub fn root_hash(&self) -> String {
        self.levels
            .last()
            .and_then(|level| level.first())
            .cloned()
            .unwrap_or_default()
    }

    /// Inclusion proof for the leaf at `leaf_index`.
    ///
    /// A self-paired odd node contributes itself as a `right` sibling so
    /// the walk reproduces the duplication applied during construction.
    pub fn generate_proof(&self, leaf_index: usize) -> Option<MerkleProof> {
        if leaf_index >= self.levels[0].len() {
            return None;
        }

        let mut proof_path = Vec::new();
        let mut index = leaf_index;

        for level in &self.levels[..self.levels.len() - 1] {
            let sibling_index = index ^ 1;
            let step = if sibling_index < level.len() {
                ProofStep {
                    sibling_hash: level[sibling_index].clone(),
                    position: if sibling_index < index {
                        SiblingPosition::Left
                    } else {
                        SiblingPosition::Right
                    },
                }
            } else {
                ProofStep {
                    sibling_hash: level[index].clone(),
                    position: SiblingPosition::Right,
                }
            };
            proof_path.push(step);
            index /= 2;
        }

        Some(MerkleProof {
            leaf_hash: self.levels[0][leaf_index].clone(),
            root_hash: self.root_hash(),
            proof_path,
        })
    }
}
