//! Octree palette reducer (spec §4.C.2), grounded on
//! `original_source/src/octree.cpp`. Pointers and the intrusive
//! "parents-of-leaves" linked list are replaced by an arena (`Vec<Node>`)
//! with index links and a `BTreeSet` standing in for that list.

use std::collections::BTreeSet;

use super::{canonicalize, PaletteReducer};
use crate::color::Rgb;
use crate::error::Result;
use crate::mat::Mat;
use crate::workqueue::WorkQueue;

const MAX_DEPTH: u32 = 9;

struct Node {
    children: [Option<usize>; 8],
    parent: Option<usize>,
    is_leaf: bool,
    sum: (u64, u64, u64),
    count: u64,
}

impl Node {
    fn new(parent: Option<usize>, is_leaf: bool) -> Self {
        Node {
            children: [None; 8],
            parent,
            is_leaf,
            sum: (0, 0, 0),
            count: 0,
        }
    }
}

struct Tree {
    nodes: Vec<Node>,
    leaf_parents: BTreeSet<usize>,
    leaf_count: usize,
}

impl Tree {
    fn new() -> Self {
        Tree {
            nodes: vec![Node::new(None, false)],
            leaf_parents: BTreeSet::new(),
            leaf_count: 0,
        }
    }

    fn insert_pixel(&mut self, c: Rgb) {
        let mut cur = 0usize;
        for depth in 0..MAX_DEPTH {
            let bit = MAX_DEPTH - 1 - depth;
            let idx = (((c.r >> bit) & 1) << 2 | ((c.g >> bit) & 1) << 1 | ((c.b >> bit) & 1))
                as usize;
            let is_leaf_level = depth == MAX_DEPTH - 1;

            if self.nodes[cur].children[idx].is_none() {
                let had_children = self.nodes[cur].children.iter().any(|c| c.is_some());
                let new_idx = self.nodes.len();
                self.nodes.push(Node::new(Some(cur), is_leaf_level));
                self.nodes[cur].children[idx] = Some(new_idx);
                if is_leaf_level {
                    self.leaf_count += 1;
                    if !had_children {
                        self.leaf_parents.insert(cur);
                    }
                }
            }
            cur = self.nodes[cur].children[idx].unwrap();
        }

        let leaf = &mut self.nodes[cur];
        leaf.sum.0 += c.r as u64;
        leaf.sum.1 += c.g as u64;
        leaf.sum.2 += c.b as u64;
        leaf.count += 1;
    }

    fn aggregate_count(&self, node: usize) -> u64 {
        self.nodes[node]
            .children
            .iter()
            .filter_map(|c| c.map(|i| self.nodes[i].count))
            .sum()
    }

    fn merge_smallest(&mut self) {
        let best = *self
            .leaf_parents
            .iter()
            .min_by_key(|&&n| self.aggregate_count(n))
            .expect("leaf_parents must be non-empty while leaf_count > 0");

        let mut sum = (0u64, 0u64, 0u64);
        let mut count = 0u64;
        let mut num_children = 0usize;
        for i in 0..8 {
            if let Some(child) = self.nodes[best].children[i] {
                sum.0 += self.nodes[child].sum.0;
                sum.1 += self.nodes[child].sum.1;
                sum.2 += self.nodes[child].sum.2;
                count += self.nodes[child].count;
                num_children += 1;
                self.nodes[best].children[i] = None;
            }
        }

        self.nodes[best].sum = sum;
        self.nodes[best].count = count;
        self.nodes[best].is_leaf = true;
        self.leaf_count = self.leaf_count - num_children + 1;
        self.leaf_parents.remove(&best);

        if let Some(parent) = self.nodes[best].parent {
            self.leaf_parents.insert(parent);
        }
    }

    fn reduce_to(&mut self, target: usize) {
        while self.leaf_count > target && !self.leaf_parents.is_empty() {
            self.merge_smallest();
        }
    }

    fn fill_palette(&self) -> Vec<Rgb> {
        let mut out = Vec::with_capacity(self.leaf_count);
        self.collect_leaves(0, &mut out);
        out
    }

    fn collect_leaves(&self, node: usize, out: &mut Vec<Rgb>) {
        let n = &self.nodes[node];
        if n.is_leaf {
            if n.count > 0 {
                let avg = |s: u64| ((s + n.count / 2) / n.count) as u8;
                out.push(Rgb::new(avg(n.sum.0), avg(n.sum.1), avg(n.sum.2)));
            }
            return;
        }
        for child in n.children.iter().flatten() {
            self.collect_leaves(*child, out);
        }
    }
}

pub struct Octree;

impl PaletteReducer for Octree {
    fn reduce(&self, image: &Mat<Rgb>, count: u8, _queue: &WorkQueue) -> Result<Vec<Rgb>> {
        let mut tree = Tree::new();
        for &pixel in image.data() {
            tree.insert_pixel(pixel);
        }

        let target = count as usize;
        tree.reduce_to(target);

        let mut palette = tree.fill_palette();
        // Open question #2: fill any remaining slots with black, matching
        // the evidently-intended behavior of the fallback-fill loop.
        if palette.len() < target {
            palette.resize(target, Rgb::BLACK);
        }
        Ok(canonicalize(palette))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_color_image_reduces_to_one_leaf() {
        let image = Mat::from_vec(4, 1, vec![Rgb::new(10, 20, 30); 4]);
        let queue = WorkQueue::new(1);
        let palette = Octree.reduce(&image, 16, &queue).unwrap();
        assert!(palette.contains(&Rgb::new(10, 20, 30)));
    }

    #[test]
    fn reduces_many_colors_to_target_count() {
        let mut data = Vec::new();
        for r in 0..8u8 {
            for g in 0..8u8 {
                data.push(Rgb::new(r * 32, g * 32, 0));
            }
        }
        let n = data.len();
        let image = Mat::from_vec(n, 1, data);
        let queue = WorkQueue::new(2);
        let palette = Octree.reduce(&image, 16, &queue).unwrap();
        assert!(palette.len() <= 16);
    }
}
