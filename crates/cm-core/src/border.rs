/// How samples outside the grid are resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BorderMode<T> {
    Clamp,
    Constant(T),
}

/// Maps a possibly out-of-range index into `[0, len)`; `None` means the
/// caller should use the constant border value.
pub fn map_index<T>(i: isize, len: usize, mode: &BorderMode<T>) -> Option<usize> {
    match mode {
        BorderMode::Constant(_) => {
            if i < 0 || i as usize >= len {
                None
            } else {
                Some(i as usize)
            }
        }
        BorderMode::Clamp => {
            if len == 0 {
                return None;
            }
            if i < 0 {
                Some(0)
            } else {
                Some((i as usize).min(len - 1))
            }
        }
    }
}
