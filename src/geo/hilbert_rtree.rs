use super::*;

const RTREE_CHILDREN_PER_NODE: usize = 8;
const HILBERT_ITERATIONS: u32 = 16;

/// Degrees. Lets a query box catch points sitting exactly on its edge despite rounding.
const OVERLAP_FUDGE_FACTOR: f64 = 1.0e-9;

#[derive(Debug)]
enum RTreeNode {
    Node {
        bbox: BoundingBox,
        children: Vec<RTreeNode>,
    },
    Leaf {
        bbox: BoundingBox,
        hilbert_num: u64,
        index: usize,
    },
}

impl RTreeNode {
    fn bounding_box(&self) -> BoundingBox {
        match self {
            Self::Node { bbox, .. } => *bbox,
            Self::Leaf { bbox, .. } => *bbox,
        }
    }

    fn hilbert_num(&self) -> u64 {
        match self {
            Self::Leaf { hilbert_num, .. } => *hilbert_num,
            Self::Node { children, .. } => children
                .iter()
                .map(|node| node.hilbert_num())
                .max()
                .unwrap_or(0),
        }
    }

    fn new_node(children: Vec<Self>) -> Self {
        let mut bbox = BoundingBox::empty();
        for child in &children {
            bbox.expand_to(&child.bounding_box());
        }

        Self::Node { bbox, children }
    }

    /// Push the index of every leaf overlapping `region` onto `buffer`.
    fn query(&self, region: &BoundingBox, buffer: &mut Vec<usize>) {
        if !self.bounding_box().overlap(region, OVERLAP_FUDGE_FACTOR) {
            return;
        }

        match self {
            Self::Leaf { index, .. } => buffer.push(*index),
            Self::Node { children, .. } => {
                for child in children {
                    child.query(region, buffer);
                }
            }
        }
    }
}

/**
 * A packed R-tree over the bounding boxes of a list of items.
 *
 * The leaves are sorted along a Hilbert curve before the upper levels are packed, so items that
 * are close together on the ground end up in the same branches of the tree. The tree does not
 * own the items, it only knows their position in the slice it was built from.
 */
#[derive(Debug)]
pub struct HilbertRTree {
    root: Option<RTreeNode>,
    len: usize,
}

impl HilbertRTree {
    /// Build an index for the provided list.
    pub fn build_for<T: Geo>(data: &[T]) -> Self {
        if data.is_empty() {
            return HilbertRTree { root: None, len: 0 };
        }

        let hc = HilbertCurve::new(HILBERT_ITERATIONS, Self::build_domain(data));

        // Build the leaf nodes - level 0
        let mut leaves: Vec<RTreeNode> = data
            .iter()
            .enumerate()
            .map(|(index, item)| RTreeNode::Leaf {
                bbox: item.bounding_box(),
                hilbert_num: hc.translate_to_curve_distance(item.centroid()),
                index,
            })
            .collect();

        // Sort the leaf nodes by Hilbert number. This is how we get locality for the parent nodes.
        leaves.sort_by_key(RTreeNode::hilbert_num);

        let mut level_nodes = leaves;
        while level_nodes.len() > 1 {
            let child_nodes = level_nodes;
            level_nodes = Vec::with_capacity(child_nodes.len() / RTREE_CHILDREN_PER_NODE + 1);

            let mut children = Vec::with_capacity(RTREE_CHILDREN_PER_NODE);
            for child_node in child_nodes.into_iter() {
                children.push(child_node);

                if children.len() == RTREE_CHILDREN_PER_NODE {
                    level_nodes.push(RTreeNode::new_node(children));
                    children = Vec::with_capacity(RTREE_CHILDREN_PER_NODE);
                }
            }

            if !children.is_empty() {
                level_nodes.push(RTreeNode::new_node(children));
            }
        }

        debug_assert_eq!(level_nodes.len(), 1);
        let root = level_nodes.into_iter().next();

        HilbertRTree {
            root,
            len: data.len(),
        }
    }

    /// The number of items in the index.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Is the index empty?
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Collect the indexes of all items whose bounding boxes overlap `region` into `buffer`.
    ///
    /// The buffer is not cleared first, and the order of the indexes is unspecified.
    pub fn query(&self, region: &BoundingBox, buffer: &mut Vec<usize>) {
        if let Some(ref root) = self.root {
            root.query(region, buffer);
        }
    }

    fn build_domain<T: Geo>(data: &[T]) -> BoundingBox {
        let mut mbr = BoundingBox::empty();

        for item in data {
            mbr.expand_to(&item.bounding_box());
        }

        mbr
    }
}

#[derive(Debug)]
struct HilbertCurve {
    // The number of iterations to use for this curve.
    //
    // This number can be a maximum of 31. If it is larger than 31, we won't have enough bits to do
    // the binary transformation correctly.
    iterations: u32,

    // This is the domain that the curve will cover.
    domain: BoundingBox,

    // These are needed for fast transformations from the "domain" space into the "Hilbert" space.
    max_dim: u32,
    width: f64,
    height: f64,
}

impl HilbertCurve {
    fn new(iterations: u32, domain: BoundingBox) -> Self {
        // iterations must be in the range 1 to 31 inclusive
        assert!((1..=31).contains(&iterations));

        let max_dim = (1u32 << iterations) - 1u32;

        // A batch of reports can easily all share a latitude or longitude, give the curve some
        // room to work with anyway.
        let width = (domain.ur.lon - domain.ll.lon).max(f64::EPSILON);
        let height = (domain.ur.lat - domain.ll.lat).max(f64::EPSILON);

        Self {
            iterations,
            domain,
            max_dim,
            width,
            height,
        }
    }

    fn coords_to_integer(&self, HilbertCoord { x, y }: HilbertCoord) -> u64 {
        debug_assert!(x <= self.max_dim);
        debug_assert!(y <= self.max_dim);

        let n = 1u64 << self.iterations;
        let mut x = u64::from(x);
        let mut y = u64::from(y);

        let mut hilbert_int = 0u64;
        let mut s = n / 2;
        while s > 0 {
            let rx = u64::from((x & s) > 0);
            let ry = u64::from((y & s) > 0);
            hilbert_int += s * s * ((3 * rx) ^ ry);

            // Rotate the quadrant so the sub-curve has the right orientation.
            if ry == 0 {
                if rx == 1 {
                    x = n - 1 - x;
                    y = n - 1 - y;
                }
                std::mem::swap(&mut x, &mut y);
            }

            s /= 2;
        }

        hilbert_int
    }

    fn translate_to_hilbert_coords(&self, coord: Coord) -> HilbertCoord {
        let hilbert_edge_len = (self.max_dim as f64) + 1.0;

        let x = ((coord.lon - self.domain.ll.lon) / self.width * hilbert_edge_len) as u32;
        let y = ((coord.lat - self.domain.ll.lat) / self.height * hilbert_edge_len) as u32;

        HilbertCoord {
            x: x.min(self.max_dim),
            y: y.min(self.max_dim),
        }
    }

    fn translate_to_curve_distance(&self, coord: Coord) -> u64 {
        self.coords_to_integer(self.translate_to_hilbert_coords(coord))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HilbertCoord {
    x: u32,
    y: u32,
}
