// Copyright 2024 Karpeles Lab Inc.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Training trie for the static-dictionary codec.
//!
//! A path from the root spells a byte sequence. The children of each node
//! form an AVL-balanced BST ordered by key byte. Nodes live in one arena
//! and reference each other by `u32` index; parent links exist only to walk
//! back up during rebalancing. The arena is capped at 2^24 nodes, at which
//! point insertion reports failure and the trie stays usable as-is.

use crate::constants::{DICT_MAX_MATCH, MAX_TRIE_NODES};
use crate::error::{Error, Result};

pub(crate) const NIL: u32 = u32::MAX;

pub(crate) struct Node {
    pub parent: u32,
    pub left: u32,
    pub right: u32,
    /// Root of this node's child BST.
    pub children: u32,
    /// Stamped during candidate extraction: id of the first candidate
    /// whose path runs through this node.
    pub order_num: u32,
    /// Insertion count, saturating.
    pub num_ref: u16,
    /// AVL height within the sibling BST.
    pub height: i8,
    pub key: u8,
}

pub struct Trie {
    pub(crate) nodes: Vec<Node>,
    /// Root of the depth-0 BST.
    pub(crate) root: u32,
}

impl Trie {
    pub fn new() -> Self {
        Trie {
            nodes: Vec::new(),
            root: NIL,
        }
    }

    /// Number of nodes allocated so far.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Insert one training byte sequence, bumping reference counts along
    /// its path. Sequences longer than 255 bytes are truncated to 255
    /// (dictionary entries cannot exceed that). Returns `Error::TrieFull`
    /// once the node cap is reached; the walk stops where it stood.
    pub fn insert(&mut self, bytes: &[u8]) -> Result<()> {
        if self.nodes.len() >= MAX_TRIE_NODES {
            return Err(Error::TrieFull);
        }

        let mut holder: Option<u32> = None;
        for &key in bytes.iter().take(DICT_MAX_MATCH) {
            let root = match holder {
                None => self.root,
                Some(h) => self.nodes[h as usize].children,
            };

            let node = match self.find(root, key) {
                Some(n) => n,
                None => {
                    let n = self.alloc(key);
                    let new_root = self.bst_insert(root, n);
                    match holder {
                        None => self.root = new_root,
                        Some(h) => self.nodes[h as usize].children = new_root,
                    }
                    n
                }
            };

            let entry = &mut self.nodes[node as usize];
            if entry.num_ref < u16::MAX {
                entry.num_ref += 1;
            }

            if self.nodes.len() >= MAX_TRIE_NODES {
                return Err(Error::TrieFull);
            }
            holder = Some(node);
        }
        Ok(())
    }

    /// Find the child with byte `key` under `of` (`None` = the root
    /// level).
    pub(crate) fn child(&self, of: Option<u32>, key: u8) -> Option<u32> {
        let root = match of {
            None => self.root,
            Some(h) => self.nodes[h as usize].children,
        };
        self.find(root, key)
    }

    fn alloc(&mut self, key: u8) -> u32 {
        let idx = self.nodes.len() as u32;
        self.nodes.push(Node {
            parent: NIL,
            left: NIL,
            right: NIL,
            children: NIL,
            order_num: 0,
            num_ref: 0,
            height: 0,
            key,
        });
        idx
    }

    fn find(&self, mut root: u32, key: u8) -> Option<u32> {
        while root != NIL {
            let node = &self.nodes[root as usize];
            root = match key.cmp(&node.key) {
                std::cmp::Ordering::Equal => return Some(root),
                std::cmp::Ordering::Less => node.left,
                std::cmp::Ordering::Greater => node.right,
            };
        }
        None
    }

    /// Insert `node` into the BST rooted at `root`, rebalance, and return
    /// the (possibly new) root.
    fn bst_insert(&mut self, root: u32, node: u32) -> u32 {
        if root == NIL {
            return node;
        }

        let key = self.nodes[node as usize].key;
        let mut at = root;
        loop {
            let here = &self.nodes[at as usize];
            if key < here.key {
                if here.left == NIL {
                    self.nodes[at as usize].left = node;
                    break;
                }
                at = here.left;
            } else {
                debug_assert!(key > here.key);
                if here.right == NIL {
                    self.nodes[at as usize].right = node;
                    break;
                }
                at = here.right;
            }
        }
        self.nodes[node as usize].parent = at;

        self.rebalance(at, root)
    }

    #[inline]
    fn height(&self, idx: u32) -> i8 {
        if idx == NIL {
            -1
        } else {
            self.nodes[idx as usize].height
        }
    }

    fn update_height(&mut self, idx: u32) {
        let left = self.height(self.nodes[idx as usize].left);
        let right = self.height(self.nodes[idx as usize].right);
        self.nodes[idx as usize].height = left.max(right) + 1;
    }

    #[inline]
    fn balance(&self, idx: u32) -> i8 {
        self.height(self.nodes[idx as usize].left) - self.height(self.nodes[idx as usize].right)
    }

    /// Walk from `from` to the BST root, updating heights and rotating
    /// where the balance factor leaves [-1, 1]. Returns the new root.
    fn rebalance(&mut self, from: u32, mut root: u32) -> u32 {
        let mut at = from;
        while at != NIL {
            self.update_height(at);
            let bf = self.balance(at);

            let rotated = if bf > 1 {
                let left = self.nodes[at as usize].left;
                if self.balance(left) < 0 {
                    self.rotate_left(left);
                }
                Some(self.rotate_right(at))
            } else if bf < -1 {
                let right = self.nodes[at as usize].right;
                if self.balance(right) > 0 {
                    self.rotate_right(right);
                }
                Some(self.rotate_left(at))
            } else {
                None
            };

            let top = rotated.unwrap_or(at);
            if self.nodes[top as usize].parent == NIL {
                root = top;
            }
            at = self.nodes[top as usize].parent;
        }
        root
    }

    /// Left rotation around `x`; returns the subtree's new top.
    fn rotate_left(&mut self, x: u32) -> u32 {
        let y = self.nodes[x as usize].right;
        debug_assert_ne!(y, NIL);
        let t = self.nodes[y as usize].left;
        let parent = self.nodes[x as usize].parent;

        self.nodes[x as usize].right = t;
        if t != NIL {
            self.nodes[t as usize].parent = x;
        }
        self.nodes[y as usize].left = x;
        self.nodes[x as usize].parent = y;
        self.nodes[y as usize].parent = parent;
        if parent != NIL {
            if self.nodes[parent as usize].left == x {
                self.nodes[parent as usize].left = y;
            } else {
                self.nodes[parent as usize].right = y;
            }
        }

        self.update_height(x);
        self.update_height(y);
        y
    }

    /// Right rotation around `x`; returns the subtree's new top.
    fn rotate_right(&mut self, x: u32) -> u32 {
        let y = self.nodes[x as usize].left;
        debug_assert_ne!(y, NIL);
        let t = self.nodes[y as usize].right;
        let parent = self.nodes[x as usize].parent;

        self.nodes[x as usize].left = t;
        if t != NIL {
            self.nodes[t as usize].parent = x;
        }
        self.nodes[y as usize].right = x;
        self.nodes[x as usize].parent = y;
        self.nodes[y as usize].parent = parent;
        if parent != NIL {
            if self.nodes[parent as usize].left == x {
                self.nodes[parent as usize].left = y;
            } else {
                self.nodes[parent as usize].right = y;
            }
        }

        self.update_height(x);
        self.update_height(y);
        y
    }
}

impl Default for Trie {
    fn default() -> Self {
        Self::new()
    }
}
