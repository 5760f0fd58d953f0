use super::*;
use rstest::rstest;

#[test]
fn test_page_request_default() {
    let request = PageRequest::default();
    assert_eq!(request.page, 1);
    assert_eq!(request.limit, 10);
}

#[test]
fn test_page_request_offset() {
    let request = PageRequest { page: 1, limit: 20 };
    assert_eq!(request.offset(), 0);

    let request = PageRequest { page: 3, limit: 20 };
    assert_eq!(request.offset(), 40);
}

#[rstest]
#[case(None, None, 1, 10)]
#[case(Some(0), Some(0), 1, 10)]
#[case(Some(2), Some(25), 2, 25)]
#[case(Some(4), Some(5000), 4, 100)]
fn test_page_request_from_query(
    #[case] page: Option<u32>,
    #[case] limit: Option<u32>,
    #[case] expected_page: u32,
    #[case] expected_limit: u32,
) {
    let request = PageRequest::from_query(page, limit, 10, 100);
    assert_eq!(request.page, expected_page);
    assert_eq!(request.limit, expected_limit);
}

#[test]
fn test_page_response_new() {
    let data = vec![1, 2, 3];
    let response = PageResponse::new(data.clone(), PageRequest { page: 1, limit: 10 }, 3);

    assert_eq!(response.data, data);
    assert_eq!(response.meta.page, 1);
    assert_eq!(response.meta.limit, 10);
    assert_eq!(response.meta.total, 3);
    assert_eq!(response.meta.total_pages, 1);
}

#[test]
fn test_page_response_pagination() {
    // 25 items, 10 per page -> 3 pages
    let response: PageResponse<i32> =
        PageResponse::new(vec![], PageRequest { page: 1, limit: 10 }, 25);
    assert_eq!(response.meta.total_pages, 3);
}

#[test]
fn test_page_response_empty() {
    let response: PageResponse<i32> = PageResponse::new(vec![], PageRequest::default(), 0);
    assert_eq!(response.meta.total_pages, 1);
}

#[test]
fn test_page_response_map_keeps_meta() {
    let response = PageResponse::new(vec![1, 2], PageRequest { page: 2, limit: 2 }, 4);
    let mapped = response.map(|n| n * 10);

    assert_eq!(mapped.data, vec![10, 20]);
    assert_eq!(mapped.meta.page, 2);
    assert_eq!(mapped.meta.total_pages, 2);
}
