//! Integration tests for Orderscope

use chrono::NaiveDate;
use orderscope::{
    aggregate_categories, build_report, build_rfm, filter_window, load_orders, summarize_categories,
    top_customers, AnalysisConfig, AnalyticsError, DateWindow,
};
use std::collections::HashSet;
use std::io::Write;
use tempfile::NamedTempFile;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Create a test CSV file with sample data
fn create_test_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "order_id,customer_unique_id,product_category_name,review_score,order_status,price,freight_value,order_purchase_timestamp"
    )
    .unwrap();

    // Customer ana - three delivered orders, one with two items and a duplicated row
    writeln!(file, "o100,ana,cama_mesa_banho,5,delivered,50.00,5.00,2018-01-03 09:15:00").unwrap();
    writeln!(file, "o101,ana,cama_mesa_banho,4,delivered,30.00,3.00,2018-02-10 14:00:00").unwrap();
    writeln!(file, "o101,ana,cama_mesa_banho,4,delivered,30.00,3.00,2018-02-10 14:00:00").unwrap();
    writeln!(file, "o102,ana,beleza_saude,3,delivered,20.00,2.00,2018-03-20 18:45:00").unwrap();

    // Customer bia - recent high value, one unreviewed item
    writeln!(file, "o200,bia,informatica_acessorios,,delivered,899.90,35.10,2018-03-30 11:00:00").unwrap();
    writeln!(file, "o200,bia,informatica_acessorios,,delivered,99.90,35.10,2018-03-30 11:00:00").unwrap();

    // Customer caio - only a canceled order
    writeln!(file, "o300,caio,beleza_saude,1,canceled,75.00,10.00,2018-02-14 08:00:00").unwrap();

    // Customer duda - old order, no category
    writeln!(file, "o400,duda,,2,delivered,15.00,7.50,2017-11-25 23:59:00").unwrap();

    file
}

#[test]
fn test_end_to_end_pipeline() {
    let test_file = create_test_csv();
    let dataset = load_orders(test_file.path()).unwrap();
    assert_eq!(dataset.len(), 8);

    let bounds = dataset.date_bounds().unwrap();
    assert_eq!(bounds, (date(2017, 11, 25), date(2018, 3, 30)));

    let config = AnalysisConfig::default();
    let window = DateWindow::new(bounds.0, bounds.1);
    let report = build_report(dataset.lines(), &window, &config).unwrap();

    assert_eq!(report.matched_lines, 8);
    let rfm = report.rfm.unwrap();
    assert_eq!(rfm.customers.len(), 3);
    assert_eq!(rfm.summary.customers, 3);

    let ana = rfm
        .customers
        .iter()
        .find(|c| c.customer_unique_id == "ana")
        .unwrap();
    assert_eq!(ana.frequency, 3);
    assert!((ana.monetary - 110.0).abs() < 1e-6);

    assert_eq!(rfm.top_customers.by_monetary[0].customer_unique_id, "bia");
    assert_eq!(rfm.top_customers.by_recency[0].customer_unique_id, "bia");
    assert_eq!(rfm.top_customers.by_recency[0].recency, 1);
    assert_eq!(rfm.top_customers.by_frequency[0].customer_unique_id, "ana");
}

#[test]
fn test_category_ranking_from_csv() {
    let test_file = create_test_csv();
    let dataset = load_orders(test_file.path()).unwrap();

    let all = summarize_categories(dataset.lines()).unwrap();
    let names: Vec<Option<&str>> = all
        .iter()
        .map(|summary| summary.product_category_name.as_deref())
        .collect();
    assert_eq!(
        names,
        vec![
            Some("beleza_saude"),
            Some("cama_mesa_banho"),
            Some("informatica_acessorios"),
            None
        ]
    );

    // each order sits in a single category here
    let distinct_orders: HashSet<&str> = dataset
        .lines()
        .iter()
        .map(|line| line.order_id.as_str())
        .collect();
    let total: usize = all.iter().map(|summary| summary.order_count).sum();
    assert_eq!(total, distinct_orders.len());

    let informatica = &all[2];
    assert_eq!(informatica.order_count, 1);
    assert_eq!(informatica.avg_review_score, None);

    for summary in &all {
        assert!(summary.order_count >= 1);
        if let Some(score) = summary.avg_review_score {
            assert!((1.0..=5.0).contains(&score));
        }
    }

    let top = aggregate_categories(dataset.lines(), 2).unwrap();
    assert_eq!(top[..], all[..2]);
}

#[test]
fn test_window_narrows_both_branches() {
    let test_file = create_test_csv();
    let dataset = load_orders(test_file.path()).unwrap();

    let window = DateWindow::new(date(2018, 2, 1), date(2018, 2, 28));
    let windowed = filter_window(dataset.lines(), &window);
    assert_eq!(windowed.len(), 3);

    let categories = aggregate_categories(windowed.iter().copied(), 10).unwrap();
    assert_eq!(categories.len(), 2);

    // caio's canceled order is in the window but never reaches RFM
    let table = build_rfm(windowed.iter().copied()).unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.customers[0].customer_unique_id, "ana");
    assert_eq!(table.customers[0].frequency, 1);
    assert_eq!(table.customers[0].recency, 1);
}

#[test]
fn test_top_k_on_small_table() {
    let test_file = create_test_csv();
    let dataset = load_orders(test_file.path()).unwrap();

    let table = build_rfm(dataset.lines()).unwrap();
    let top = top_customers(&table, 5);

    assert_eq!(top.by_recency.len(), 3);
    assert_eq!(top.by_frequency.len(), 3);
    assert_eq!(top.by_monetary.len(), 3);
    assert!(top
        .by_monetary
        .windows(2)
        .all(|pair| pair[0].monetary >= pair[1].monetary));
    assert!(top
        .by_recency
        .windows(2)
        .all(|pair| pair[0].recency <= pair[1].recency));
}

#[test]
fn test_empty_window_is_reported() {
    let test_file = create_test_csv();
    let dataset = load_orders(test_file.path()).unwrap();
    let config = AnalysisConfig::default();

    let window = DateWindow::new(date(2017, 12, 1), date(2017, 12, 31));
    let report = build_report(dataset.lines(), &window, &config).unwrap();
    assert_eq!(report.matched_lines, 0);
    assert!(report.categories.is_empty());
    assert!(report.rfm.is_none());

    let result = build_rfm(filter_window(dataset.lines(), &window).iter().copied());
    assert!(matches!(result, Err(AnalyticsError::EmptyRfmInput)));
}

#[test]
fn test_canceled_only_window_keeps_categories() {
    let test_file = create_test_csv();
    let dataset = load_orders(test_file.path()).unwrap();
    let config = AnalysisConfig::default();

    // Only caio's canceled order falls on this day
    let window = DateWindow::new(date(2018, 2, 14), date(2018, 2, 14));
    let report = build_report(dataset.lines(), &window, &config).unwrap();
    assert_eq!(report.matched_lines, 1);
    assert_eq!(report.categories.len(), 1);
    assert_eq!(
        report.categories[0].product_category_name.as_deref(),
        Some("beleza_saude")
    );
    assert!(report.rfm.is_none());
}

#[test]
fn test_rfm_is_deterministic() {
    let test_file = create_test_csv();
    let dataset = load_orders(test_file.path()).unwrap();

    let first = build_rfm(dataset.lines()).unwrap();
    let second = build_rfm(dataset.lines()).unwrap();
    assert_eq!(first, second);

    let encoded: HashSet<&str> = first
        .customers
        .iter()
        .map(|c| c.customer_encoded_id.as_str())
        .collect();
    assert_eq!(encoded.len(), first.len());
}
