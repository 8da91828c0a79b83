//! Page arithmetic for bookmark listings

/// Page size used when the caller gives none or a non-positive one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pages are 1-based; anything below 1 becomes 1.
pub fn normalize_page(page: i64) -> u32 {
    if page < 1 {
        1
    } else {
        u32::try_from(page).unwrap_or(u32::MAX)
    }
}

/// Non-positive sizes become `DEFAULT_PAGE_SIZE`, oversized ones are clamped
/// to `MAX_PAGE_SIZE`.
pub fn normalize_page_size(page_size: i64) -> u32 {
    if page_size < 1 {
        DEFAULT_PAGE_SIZE
    } else if page_size > i64::from(MAX_PAGE_SIZE) {
        MAX_PAGE_SIZE
    } else {
        page_size as u32
    }
}

/// `ceil(total_count / page_size)`, never less than 1.
pub fn total_pages(total_count: u64, page_size: u32) -> u32 {
    let page_size = u64::from(page_size.max(1));
    let pages = total_count.div_ceil(page_size).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}
