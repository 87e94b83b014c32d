/// A zero-copy query key-value iterator.
///
/// # Example
/// ```rust
/// # use relaygate_kernel::utils::QueryKvIter;
/// let mut iter = QueryKvIter::new("a=1&b=2&c");
/// assert_eq!(iter.next(), Some(("a", Some("1"))));
/// assert_eq!(iter.next(), Some(("b", Some("2"))));
/// assert_eq!(iter.next(), Some(("c", None)));
/// assert_eq!(iter.next(), None);
/// ```
#[derive(Debug, Clone)]
pub struct QueryKvIter<'a> {
    inner: &'a str,
}

impl<'a> QueryKvIter<'a> {
    pub fn new(query: &'a str) -> Self {
        Self { inner: query }
    }
}

impl<'a> Iterator for QueryKvIter<'a> {
    type Item = (&'a str, Option<&'a str>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.inner.is_empty() {
                return None;
            }
            let pair = match self.inner.split_once('&') {
                Some((pair, rest)) => {
                    self.inner = rest;
                    pair
                }
                None => std::mem::take(&mut self.inner),
            };
            if pair.is_empty() {
                continue;
            }
            return Some(match pair.split_once('=') {
                Some((k, v)) => (k, Some(v)),
                None => (pair, None),
            });
        }
    }
}
