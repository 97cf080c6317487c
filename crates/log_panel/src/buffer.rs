use parking_lot::Mutex;

/// Unbounded multi-producer append buffer.
///
/// [`drain_all`](Self::drain_all) swaps the contents out under the same lock
/// appends take, so every appended item lands in exactly one drain.
#[derive(Debug)]
pub struct BatchBuffer<T> {
	items: Mutex<Vec<T>>,
}

impl<T> Default for BatchBuffer<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> BatchBuffer<T> {
	/// Creates an empty buffer.
	pub fn new() -> Self {
		Self { items: Mutex::new(Vec::new()) }
	}

	/// Appends one item.
	pub fn append(&self, item: T) {
		self.items.lock().push(item);
	}

	/// Removes and returns everything buffered so far, oldest first.
	pub fn drain_all(&self) -> Vec<T> {
		std::mem::take(&mut *self.items.lock())
	}

	/// Number of buffered items.
	pub fn len(&self) -> usize {
		self.items.lock().len()
	}

	/// Returns true when nothing is buffered.
	pub fn is_empty(&self) -> bool {
		self.items.lock().is_empty()
	}
}
