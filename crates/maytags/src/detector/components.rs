//! Union-find labeling of same-colored pixel components.

use super::threshold::{Label, LabelMap};

/// State of one pixel slot in the forest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Node {
    /// Never looked up; behaves as a singleton root.
    Unvisited,
    Root { size: u32 },
    Child { parent: u32 },
}

/// Disjoint-set arena indexed by pixel id `y * width + x`.
///
/// Representatives are only stable within one labeling pass.
#[derive(Clone, Debug, Default)]
pub struct ComponentForest {
    nodes: Vec<Node>,
}

impl ComponentForest {
    /// Forest of `len` unvisited singletons.
    pub fn with_len(len: usize) -> Self {
        Self {
            nodes: vec![Node::Unvisited; len],
        }
    }

    fn reset(&mut self, len: usize) {
        self.nodes.clear();
        self.nodes.resize(len, Node::Unvisited);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Representative of `id`'s set, compressing the path walked.
    ///
    /// The only operation that turns an unvisited slot into a root.
    pub fn find(&mut self, id: u32) -> u32 {
        let mut root = id;
        loop {
            match self.nodes[root as usize] {
                Node::Unvisited => {
                    self.nodes[root as usize] = Node::Root { size: 1 };
                    break;
                }
                Node::Root { .. } => break,
                Node::Child { parent } => root = parent,
            }
        }

        let mut current = id;
        while current != root {
            match self.nodes[current as usize] {
                Node::Child { parent } => {
                    self.nodes[current as usize] = Node::Child { parent: root };
                    current = parent;
                }
                _ => break,
            }
        }
        root
    }

    /// Merge the sets of `a` and `b`; the smaller tree goes under the larger,
    /// `a`'s under `b`'s on a tie. Returns the new representative.
    pub fn union(&mut self, a: u32, b: u32) -> u32 {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return ra;
        }
        let sa = self.size(ra);
        let sb = self.size(rb);
        let (child, root) = if sa > sb { (rb, ra) } else { (ra, rb) };
        self.nodes[child as usize] = Node::Child { parent: root };
        self.nodes[root as usize] = Node::Root { size: sa + sb };
        root
    }

    /// Pixel count of the set containing `id`.
    pub fn size(&self, id: u32) -> u32 {
        let mut current = id;
        loop {
            match self.nodes[current as usize] {
                Node::Unvisited => return 1,
                Node::Root { size } => return size,
                Node::Child { parent } => current = parent,
            }
        }
    }
}

/// Raster-scan connected component labeling over a [`LabelMap`].
///
/// Black components are 4-connected, white components 8-connected, so a thin
/// white diagonal never splits a black region in two.
#[derive(Clone, Debug, Default)]
pub struct ComponentLabeler {
    forest: ComponentForest,
}

impl ComponentLabeler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forest(&mut self) -> &mut ComponentForest {
        &mut self.forest
    }

    /// Label `labels` and return the forest; indeterminate pixels stay singletons.
    pub fn label(&mut self, labels: &LabelMap) -> &mut ComponentForest {
        let (w, h) = (labels.width(), labels.height());
        self.forest.reset(w * h);
        if w == 0 || h == 0 {
            return &mut self.forest;
        }
        let forest = &mut self.forest;
        let id = |x: usize, y: usize| (y * w + x) as u32;

        for x in 1..w {
            let v = labels.get(x, 0);
            if v.is_determinate() && v == labels.get(x - 1, 0) {
                forest.union(id(x, 0), id(x - 1, 0));
            }
        }

        for y in 1..h {
            for x in 0..w {
                let v = labels.get(x, y);
                if !v.is_determinate() {
                    continue;
                }
                let up = labels.get(x, y - 1);
                if x == 0 {
                    if up == v {
                        forest.union(id(x, y), id(x, y - 1));
                    }
                } else {
                    let left = labels.get(x - 1, y);
                    let up_left = labels.get(x - 1, y - 1);
                    if left == v {
                        forest.union(id(x, y), id(x - 1, y));
                    }
                    // Up is already reachable through left and up-left.
                    if (x == 1 || !(left == up_left && up_left == up)) && up == v {
                        forest.union(id(x, y), id(x, y - 1));
                    }
                    if v == Label::White
                        && (x == 1 || !(left == up_left || up == up_left))
                        && up_left == v
                    {
                        forest.union(id(x, y), id(x - 1, y - 1));
                    }
                }
                if v == Label::White && x + 1 < w {
                    let up_right = labels.get(x + 1, y - 1);
                    if up != up_right && up_right == v {
                        forest.union(id(x, y), id(x + 1, y - 1));
                    }
                }
            }
        }
        forest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::threshold::Thresholder;
    use maytags_core::GrayImage;

    fn random_labels(width: usize, height: usize, seed: u32) -> LabelMap {
        let mut state = seed;
        let mut img = GrayImage::new(width, height);
        for v in img.data.iter_mut() {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            *v = (state >> 16) as u8;
        }
        let mut t = Thresholder::new();
        t.threshold(&img.view(), 30).clone()
    }

    #[test]
    fn find_is_idempotent() {
        let labels = random_labels(37, 29, 11);
        let mut labeler = ComponentLabeler::new();
        let forest = labeler.label(&labels);
        for i in 0..forest.len() as u32 {
            let r = forest.find(i);
            assert_eq!(forest.find(r), r);
            assert!(forest.size(r) >= 1);
        }
    }

    #[test]
    fn equal_neighbors_share_a_representative() {
        for seed in [1, 5, 99] {
            let labels = random_labels(41, 33, seed);
            let (w, h) = (labels.width(), labels.height());
            let mut labeler = ComponentLabeler::new();
            let forest = labeler.label(&labels);
            let id = |x: usize, y: usize| (y * w + x) as u32;

            for y in 0..h {
                for x in 0..w {
                    let v = labels.get(x, y);
                    if !v.is_determinate() {
                        continue;
                    }
                    let mut neighbors = vec![(x + 1, y), (x, y + 1)];
                    if v == Label::White {
                        neighbors.push((x + 1, y + 1));
                        if x > 0 {
                            neighbors.push((x - 1, y + 1));
                        }
                    }
                    for (nx, ny) in neighbors {
                        if nx < w && ny < h && labels.get(nx, ny) == v {
                            assert_eq!(
                                forest.find(id(x, y)),
                                forest.find(id(nx, ny)),
                                "({x}, {y}) -> ({nx}, {ny})"
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn union_by_size_tracks_counts() {
        let mut forest = ComponentForest::with_len(6);
        assert_eq!(forest.size(4), 1);
        forest.union(0, 1);
        forest.union(2, 1);
        let r = forest.union(3, 4);
        assert_eq!(forest.size(r), 2);
        let big = forest.union(3, 0);
        assert_eq!(forest.find(0), big);
        assert_eq!(forest.size(big), 5);
        assert_eq!(forest.size(4), 5);
        assert_eq!(forest.size(5), 1);
        assert_ne!(forest.find(5), big);
    }

    #[test]
    fn black_diagonal_stays_disconnected() {
        let mut img = GrayImage::filled(8, 8, 255);
        img.set(2, 2, 0);
        img.set(3, 3, 0);
        let mut t = Thresholder::new();
        let labels = t.threshold(&img.view(), 5).clone();
        assert_eq!(labels.get(2, 2), Label::Black);
        assert_eq!(labels.get(3, 3), Label::Black);
        let mut labeler = ComponentLabeler::new();
        let forest = labeler.label(&labels);
        assert_ne!(forest.find(2 * 8 + 2), forest.find(3 * 8 + 3));
        // The white pixels around them form one component.
        assert_eq!(forest.find(0), forest.find(63));
        let root = forest.find(0);
        assert_eq!(forest.size(root), 62);
    }
}
