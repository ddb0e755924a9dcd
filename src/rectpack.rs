//! Rectangle packer is used to pack a set of smaller rectangles into one big,
//! here it places lightmap faces into fixed-size lightmap pages.
//!
//! The packer is a binary-split tree: a free node either holds a placed
//! rectangle, or is split into two children along the axis with more leftover
//! space. Nodes live in a flat arena and are referenced by index, traversal
//! uses an explicit stack to keep stack usage flat for adversarial inputs.

use crate::math::Rect;
use nalgebra::Scalar;
use num_traits::{NumAssign, Zero};

struct RectPackNode<T>
where
    T: NumAssign + Scalar + PartialOrd + Copy,
{
    filled: bool,
    split: bool,
    bounds: Rect<T>,
    left: usize,
    right: usize,
}

impl<T> RectPackNode<T>
where
    T: NumAssign + Scalar + PartialOrd + Copy,
{
    fn new(bounds: Rect<T>) -> Self {
        Self {
            bounds,
            filled: false,
            split: false,
            left: 0,
            right: 0,
        }
    }
}

/// See module docs.
pub struct RectPacker<T>
where
    T: NumAssign + Scalar + PartialOrd + Copy,
{
    nodes: Vec<RectPackNode<T>>,
    width: T,
    height: T,
    unvisited: Vec<usize>,
}

impl<T> RectPacker<T>
where
    T: NumAssign + Scalar + PartialOrd + Copy,
{
    /// Creates new instance of rectangle packer with given bounds.
    pub fn new(w: T, h: T) -> Self {
        let nodes = vec![RectPackNode::new(Rect::new(
            Zero::zero(),
            Zero::zero(),
            w,
            h,
        ))];
        Self {
            nodes,
            width: w,
            height: h,
            unvisited: Default::default(),
        }
    }

    /// Clears the packer and prepares it for another run. It is much cheaper
    /// than creating a new packer, because it reuses previously allocated
    /// memory.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.unvisited.clear();
        self.nodes.push(RectPackNode::new(Rect::new(
            Zero::zero(),
            Zero::zero(),
            self.width,
            self.height,
        )));
    }

    /// Tries to find free place to put rectangle with given size. Returns None
    /// if there is insufficient space.
    pub fn find_free(&mut self, w: T, h: T) -> Option<Rect<T>> {
        if self.unvisited.is_empty() {
            // Root node index.
            self.unvisited.push(0);
        }

        while let Some(node_index) = self.unvisited.pop() {
            let node = &mut self.nodes[node_index];
            if node.split {
                self.unvisited.push(node.right);
                self.unvisited.push(node.left);
            } else if !node.filled && node.bounds.w() >= w && node.bounds.h() >= h {
                if node.bounds.w() == w && node.bounds.h() == h {
                    node.filled = true;
                    return Some(node.bounds);
                }

                // Split and continue.
                node.split = true;

                let (left_bounds, right_bounds) = if node.bounds.w() - w > node.bounds.h() - h {
                    (
                        Rect::new(node.bounds.x(), node.bounds.y(), w, node.bounds.h()),
                        Rect::new(
                            node.bounds.x() + w,
                            node.bounds.y(),
                            node.bounds.w() - w,
                            node.bounds.h(),
                        ),
                    )
                } else {
                    (
                        Rect::new(node.bounds.x(), node.bounds.y(), node.bounds.w(), h),
                        Rect::new(
                            node.bounds.x(),
                            node.bounds.y() + h,
                            node.bounds.w(),
                            node.bounds.h() - h,
                        ),
                    )
                };

                let left = self.nodes.len();
                self.nodes.push(RectPackNode::new(left_bounds));
                let right = self.nodes.len();
                self.nodes.push(RectPackNode::new(right_bounds));

                let node = &mut self.nodes[node_index];
                node.left = left;
                node.right = right;

                self.unvisited.push(left);
            }
        }

        None
    }
}

#[cfg(test)]
mod test {
    use super::RectPacker;
    use crate::math::Rect;

    #[test]
    fn rect_packer_find_free() {
        let mut rp = RectPacker::new(10.0, 10.0);

        assert_eq!(rp.find_free(20.0, 20.0), None);
        assert_eq!(rp.find_free(1.0, 1.0), Some(Rect::new(0.0, 0.0, 1.0, 1.0)));
        assert_eq!(rp.find_free(9.0, 9.0), Some(Rect::new(0.0, 1.0, 9.0, 9.0)));
    }

    #[test]
    fn rect_packer_clear() {
        let mut rp = RectPacker::new(10, 10);

        assert!(rp.find_free(10, 10).is_some());
        assert!(rp.find_free(1, 1).is_none());

        rp.clear();
        assert_eq!(rp.find_free(1, 1), Some(Rect::new(0, 0, 1, 1)));
    }

    #[test]
    fn rect_packer_exact_fit_tiling() {
        // Sixteen 4x4 tiles must tile a 16x16 sheet without a single failure.
        let mut rp = RectPacker::new(16, 16);
        let mut placed = Vec::new();
        for _ in 0..16 {
            placed.push(rp.find_free(4, 4).expect("tile must fit"));
        }
        assert!(rp.find_free(4, 4).is_none());

        for (i, a) in placed.iter().enumerate() {
            for b in placed.iter().skip(i + 1) {
                assert!(!rects_overlap(a, b), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn rect_packer_random_stress_no_overlap() {
        use rand::{rngs::StdRng, Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(0x1ab4);
        for _ in 0..10 {
            let mut rp = RectPacker::new(256, 256);
            let mut placed = Vec::<Rect<i32>>::new();

            for _ in 0..200 {
                let w = rng.gen_range(1..64);
                let h = rng.gen_range(1..64);
                if let Some(rect) = rp.find_free(w, h) {
                    // Requested size, fully in bounds.
                    assert_eq!(rect.w(), w);
                    assert_eq!(rect.h(), h);
                    assert!(rect.x() >= 0 && rect.y() >= 0);
                    assert!(rect.x() + rect.w() <= 256 && rect.y() + rect.h() <= 256);
                    placed.push(rect);
                }
            }

            for (i, a) in placed.iter().enumerate() {
                for b in placed.iter().skip(i + 1) {
                    assert!(!rects_overlap(a, b), "{a:?} overlaps {b:?}");
                }
            }
        }
    }

    fn rects_overlap(a: &Rect<i32>, b: &Rect<i32>) -> bool {
        a.x() < b.x() + b.w()
            && b.x() < a.x() + a.w()
            && a.y() < b.y() + b.h()
            && b.y() < a.y() + a.h()
    }
}
