/// Releases capacity a vector grew into during an unusually large frame.
pub(crate) fn trim_vector_if_needed<T>(vector: &mut Vec<T>, max_capacity: usize) {
    if vector.capacity() > max_capacity {
        vector.shrink_to(max_capacity);
    }
}
