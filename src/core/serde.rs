/*!
 * Serde Helpers
 * Skip-serializing predicates for compact persisted records
 */

#[inline]
pub fn is_zero_f64(v: &f64) -> bool {
    *v == 0.0
}

#[inline]
pub fn is_empty_vec<T>(v: &Vec<T>) -> bool {
    v.is_empty()
}

#[inline]
pub fn is_empty_map<K, V>(m: &std::collections::HashMap<K, V>) -> bool {
    m.is_empty()
}
