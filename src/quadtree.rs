use crate::math::Point2d;
use crate::util::Interval;
use smallvec::SmallVec;

/// An axis-aligned rectangle.
///
/// Point containment is half-open: a point on the `min` edge is inside,
/// a point on the `max` edge is not. This gives every point a unique
/// quadrant when a [QuadTree] node subdivides.
#[derive(Clone, Copy, Debug)]
pub struct Rect {
    pub x: Interval<f64>,
    pub y: Interval<f64>,
}

impl Rect {
    /// Creates a rectangle from its min and max corners.
    pub fn new(min: Point2d, max: Point2d) -> Self {
        Self {
            x: Interval::new(min.x, max.x),
            y: Interval::new(min.y, max.y),
        }
    }

    /// Creates a square rectangle centred on a point.
    pub fn centred(centre: Point2d, radius: f64) -> Self {
        Self {
            x: Interval::disc(centre.x, radius),
            y: Interval::disc(centre.y, radius),
        }
    }

    /// Returns true if the point lies inside the rectangle (half-open).
    pub fn contains(&self, p: Point2d) -> bool {
        p.x >= self.x.min && p.x < self.x.max && p.y >= self.y.min && p.y < self.y.max
    }

    /// Returns true if the point lies inside or on the boundary.
    pub fn contains_closed(&self, p: Point2d) -> bool {
        self.x.contains(p.x) && self.y.contains(p.y)
    }

    /// Returns true if the two rectangles overlap.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x.overlaps(&other.x) && self.y.overlaps(&other.y)
    }

    /// Splits the rectangle into four equal quadrants.
    fn quadrants(&self) -> [Rect; 4] {
        let mx = self.x.midpoint();
        let my = self.y.midpoint();
        let split = |x: Interval<f64>, y: Interval<f64>| Rect { x, y };
        [
            split(Interval::new(self.x.min, mx), Interval::new(self.y.min, my)),
            split(Interval::new(mx, self.x.max), Interval::new(self.y.min, my)),
            split(Interval::new(self.x.min, mx), Interval::new(my, self.y.max)),
            split(Interval::new(mx, self.x.max), Interval::new(my, self.y.max)),
        ]
    }
}

/// A point quadtree used for proximity queries over vehicle positions.
///
/// The tree is rebuilt from scratch every simulation tick, so it supports
/// insertion and querying only; there is no removal.
pub struct QuadTree<T> {
    root: Node<T>,
    max_items: usize,
    max_depth: usize,
}

struct Node<T> {
    bounds: Rect,
    depth: usize,
    items: SmallVec<[(Point2d, T); 8]>,
    children: Option<Box<[Node<T>; 4]>>,
}

impl<T: Copy> QuadTree<T> {
    /// Creates an empty tree covering `bounds`. A node holding more than
    /// `max_items` entries subdivides, up to `max_depth` levels.
    pub fn new(bounds: Rect, max_items: usize, max_depth: usize) -> Self {
        Self {
            root: Node::new(bounds, 0),
            max_items,
            max_depth,
        }
    }

    /// Inserts a point entry. Points outside the tree bounds are kept at
    /// the root rather than rejected.
    pub fn insert(&mut self, point: Point2d, item: T) {
        self.root.insert(point, item, self.max_items, self.max_depth);
    }

    /// Collects all entries whose point lies inside `rect`.
    pub fn query(&self, rect: &Rect) -> Vec<(Point2d, T)> {
        let mut out = Vec::new();
        self.root.query(rect, &mut out);
        out
    }
}

impl<T: Copy> Node<T> {
    fn new(bounds: Rect, depth: usize) -> Self {
        Self {
            bounds,
            depth,
            items: SmallVec::new(),
            children: None,
        }
    }

    fn insert(&mut self, point: Point2d, item: T, max_items: usize, max_depth: usize) {
        if let Some(children) = self.children.as_mut() {
            if let Some(child) = children.iter_mut().find(|c| c.bounds.contains(point)) {
                child.insert(point, item, max_items, max_depth);
                return;
            }
        }
        self.items.push((point, item));
        if self.children.is_none() && self.items.len() > max_items && self.depth < max_depth {
            self.subdivide(max_items, max_depth);
        }
    }

    /// Splits into four children and pushes down every item that fits
    /// entirely inside one of them. Items straddling a split line stay at
    /// this level.
    fn subdivide(&mut self, max_items: usize, max_depth: usize) {
        let depth = self.depth + 1;
        let [a, b, c, d] = self.bounds.quadrants();
        let mut children = Box::new([
            Node::new(a, depth),
            Node::new(b, depth),
            Node::new(c, depth),
            Node::new(d, depth),
        ]);
        let mut kept = SmallVec::new();
        for (point, item) in self.items.drain(..) {
            match children.iter_mut().find(|c| c.bounds.contains(point)) {
                Some(child) => child.insert(point, item, max_items, max_depth),
                None => kept.push((point, item)),
            }
        }
        self.items = kept;
        self.children = Some(children);
    }

    fn query(&self, rect: &Rect, out: &mut Vec<(Point2d, T)>) {
        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                if child.bounds.intersects(rect) {
                    child.query(rect, out);
                }
            }
        }
        for &(point, item) in &self.items {
            if rect.contains(point) {
                out.push((point, item));
            }
        }
    }
}
