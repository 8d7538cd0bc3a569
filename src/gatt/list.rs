use std::ops::Deref;

use super::*;

/// Source of a contiguous run of attributes. Services, characteristics, and
/// descriptors are all providers, and so is any ordered list of providers.
pub trait AttrProvider {
    /// Returns the number of attributes contributed by the provider.
    fn attr_count(&self) -> usize;

    /// Returns the attribute at local index `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.attr_count()`.
    fn attr_at(&self, i: usize) -> Attr<'_>;
}

/// Ordered list of attribute providers addressed as one flat table.
///
/// The total attribute count is computed once when the list is created. A
/// global index is resolved by walking the providers in declaration order and
/// delegating to the one whose range contains the index.
#[derive(Debug)]
#[must_use]
pub struct AttrList<P> {
    items: Box<[P]>,
    n: usize,
}

impl<P: AttrProvider> AttrList<P> {
    /// Creates a flat view over `items`.
    pub fn new(items: impl Into<Box<[P]>>) -> Self {
        let items = items.into();
        let n = items.iter().map(P::attr_count).sum();
        Self { items, n }
    }

    /// Returns the provider index and the local index for global index `i` or
    /// [`None`] if `i` is out of range.
    #[must_use]
    pub fn locate(&self, mut i: usize) -> Option<(usize, usize)> {
        if i >= self.n {
            return None;
        }
        for (k, p) in self.items.iter().enumerate() {
            let n = p.attr_count();
            if i < n {
                return Some((k, i));
            }
            i -= n;
        }
        unreachable!("attribute count mismatch")
    }
}

impl<P: AttrProvider> AttrProvider for AttrList<P> {
    #[inline(always)]
    fn attr_count(&self) -> usize {
        self.n
    }

    fn attr_at(&self, i: usize) -> Attr<'_> {
        let Some((k, j)) = self.locate(i) else {
            panic!("attribute index {i} out of range (count {})", self.n);
        };
        self.items[k].attr_at(j)
    }
}

impl<P> Default for AttrList<P> {
    #[inline]
    fn default() -> Self {
        Self {
            items: Box::default(),
            n: 0,
        }
    }
}

impl<P> Deref for AttrList<P> {
    type Target = [P];

    #[inline(always)]
    fn deref(&self) -> &Self::Target {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Provider with `n` attributes that records its id in the attribute
    /// access result.
    #[derive(Debug)]
    struct Fixed {
        id: u8,
        n: usize,
        acc: Box<[Echo]>,
    }

    #[derive(Debug)]
    struct Echo(u8, u8);

    impl AttrAccess for Echo {
        fn access(&self, args: &mut AccessArgs<'_>, _: Handle) -> AccessResult {
            args.read_from(&[self.0, self.1])
        }
    }

    impl Fixed {
        fn new(id: u8, n: usize) -> Self {
            #[allow(clippy::cast_possible_truncation)]
            let acc = (0..n).map(|j| Echo(id, j as u8)).collect();
            Self { id, n, acc }
        }
    }

    impl AttrProvider for Fixed {
        fn attr_count(&self) -> usize {
            self.n
        }

        fn attr_at(&self, i: usize) -> Attr<'_> {
            assert!(i < self.n);
            Attr::new(Uuid16::new(0xFF00 | u16::from(self.id)).unwrap(), &self.acc[i])
        }
    }

    fn read(at: Attr) -> (u8, u8) {
        let mut buf = [0_u8; 2];
        let mut args = AccessArgs::read(&mut buf);
        assert_eq!(at.access(&mut args, Handle::MIN), AccessResult::Success);
        (buf[0], buf[1])
    }

    #[test]
    fn flat_index() {
        let counts = [2, 0, 3, 1];
        let l = AttrList::new(
            (counts.iter().enumerate())
                .map(|(id, &n)| Fixed::new(u8::try_from(id).unwrap(), n))
                .collect::<Vec<_>>(),
        );
        assert_eq!(l.attr_count(), counts.iter().sum::<usize>());
        let mut i = 0;
        for (k, &n) in counts.iter().enumerate() {
            for j in 0..n {
                assert_eq!(l.locate(i), Some((k, j)));
                assert_eq!(read(l.attr_at(i)), (u8::try_from(k).unwrap(), u8::try_from(j).unwrap()));
                i += 1;
            }
        }
        assert_eq!(l.locate(i), None);
        assert_eq!(l[2].id, 2);
    }

    #[test]
    fn nested() {
        let inner = || AttrList::new(vec![Fixed::new(1, 1), Fixed::new(2, 2)]);
        let l = AttrList::new(vec![inner(), AttrList::default(), inner()]);
        assert_eq!(l.attr_count(), 6);
        assert_eq!(read(l.attr_at(0)), (1, 0));
        assert_eq!(read(l.attr_at(2)), (2, 1));
        assert_eq!(read(l.attr_at(3)), (1, 0));
        assert_eq!(read(l.attr_at(5)), (2, 1));
        assert_eq!(l.locate(4), Some((2, 1)));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn out_of_range() {
        let l = AttrList::new(vec![Fixed::new(0, 3)]);
        let _ = l.attr_at(3);
    }
}
