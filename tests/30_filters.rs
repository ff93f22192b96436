mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn list(
    server: &common::TestServer,
    client: &reqwest::Client,
    token: &str,
    query: &str,
) -> Result<Value> {
    let res = client
        .get(format!("{}/books{}", server.base_url, query))
        .bearer_auth(token)
        .send()
        .await?;
    anyhow::ensure!(
        res.status() == StatusCode::OK,
        "list failed: {}",
        res.text().await?
    );
    Ok(res.json::<Value>().await?)
}

fn titles(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .map(|book| book["title"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn listings_paginate_at_ten_per_page() -> Result<()> {
    let Some(server) = common::ensure_server().await? else {
        return Ok(());
    };
    let client = reqwest::Client::new();
    let token = common::signup(server, &client).await?;

    for i in 0..12 {
        let data = common::book_json(&format!("Volume {:02}", i), "Fiction", "Serial Author");
        common::create_book(server, &client, &token, &data).await?;
    }

    let body = list(server, &client, &token, "").await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(10));
    assert_eq!(body["pagination"]["total"], json!(12));
    assert_eq!(body["pagination"]["page"], json!(1));
    assert_eq!(body["pagination"]["limit"], json!(10));
    assert_eq!(body["pagination"]["totalPages"], json!(2));

    let body = list(server, &client, &token, "?page=2").await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["pagination"]["page"], json!(2));
    assert_eq!(body["pagination"]["total"], json!(12));

    // Pages past the end are empty, not errors
    let body = list(server, &client, &token, "?page=99").await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));
    assert_eq!(body["pagination"]["total"], json!(12));

    Ok(())
}

#[tokio::test]
async fn title_and_author_match_substrings_case_insensitively() -> Result<()> {
    let Some(server) = common::ensure_server().await? else {
        return Ok(());
    };
    let client = reqwest::Client::new();
    let token = common::signup(server, &client).await?;

    for (title, author) in [
        ("Dune Messiah", "Frank Herbert"),
        ("The Dune Encyclopedia", "Willis McNelly"),
        ("Foundation", "Isaac Asimov"),
    ] {
        let data = common::book_json(title, "Fiction", author);
        common::create_book(server, &client, &token, &data).await?;
    }

    let body = list(server, &client, &token, "?title=dune").await?;
    let mut found = titles(&body);
    found.sort();
    assert_eq!(found, vec!["Dune Messiah", "The Dune Encyclopedia"]);

    let body = list(server, &client, &token, "?authorName=HERBERT").await?;
    assert_eq!(titles(&body), vec!["Dune Messiah"]);

    Ok(())
}

#[tokio::test]
async fn filters_combine_conjunctively() -> Result<()> {
    let Some(server) = common::ensure_server().await? else {
        return Ok(());
    };
    let client = reqwest::Client::new();
    let token = common::signup(server, &client).await?;

    let mut stocked_fiction = common::book_json("Stocked Fiction", "Fiction", "Prolific Pen");
    stocked_fiction["quantity"] = json!(3);
    let mut sold_out_fiction = common::book_json("Sold Out Fiction", "Fiction", "Prolific Pen");
    sold_out_fiction["quantity"] = json!(0);
    let mut stocked_essays = common::book_json("Stocked Essays", "Non-Fiction", "Prolific Pen");
    stocked_essays["quantity"] = json!(3);

    for data in [&stocked_fiction, &sold_out_fiction, &stocked_essays] {
        common::create_book(server, &client, &token, data).await?;
    }

    let body = list(server, &client, &token, "?genre=Fiction&inStock=true").await?;
    assert_eq!(titles(&body), vec!["Stocked Fiction"]);

    let body = list(server, &client, &token, "?inStock=false").await?;
    assert_eq!(titles(&body), vec!["Sold Out Fiction"]);

    Ok(())
}

#[tokio::test]
async fn price_bounds_are_inclusive() -> Result<()> {
    let Some(server) = common::ensure_server().await? else {
        return Ok(());
    };
    let client = reqwest::Client::new();
    let token = common::signup(server, &client).await?;

    for (title, price) in [
        ("Budget Reads", 10.0),
        ("Mid Shelf", 20.0),
        ("Collector Piece", 30.0),
    ] {
        let mut data = common::book_json(title, "Fiction", "Price Ladder");
        data["sellingPrice"] = json!(price);
        common::create_book(server, &client, &token, &data).await?;
    }

    let body = list(server, &client, &token, "?minPrice=10&maxPrice=20").await?;
    let mut found = titles(&body);
    found.sort();
    assert_eq!(found, vec!["Budget Reads", "Mid Shelf"]);

    let body = list(server, &client, &token, "?minPrice=20.01").await?;
    assert_eq!(titles(&body), vec!["Collector Piece"]);

    Ok(())
}

#[tokio::test]
async fn sorting_defaults_to_newest_first() -> Result<()> {
    let Some(server) = common::ensure_server().await? else {
        return Ok(());
    };
    let client = reqwest::Client::new();
    let token = common::signup(server, &client).await?;

    for (title, price) in [("Oldest", 30.0), ("Middle", 10.0), ("Newest", 20.0)] {
        let mut data = common::book_json(title, "Fiction", "Steady Hand");
        data["sellingPrice"] = json!(price);
        common::create_book(server, &client, &token, &data).await?;
    }

    let body = list(server, &client, &token, "").await?;
    assert_eq!(titles(&body), vec!["Newest", "Middle", "Oldest"]);

    let body = list(server, &client, &token, "?sortBy=sellingPrice&sortOrder=asc").await?;
    assert_eq!(titles(&body), vec!["Middle", "Newest", "Oldest"]);

    Ok(())
}

#[tokio::test]
async fn unusable_filters_come_back_as_field_errors() -> Result<()> {
    let Some(server) = common::ensure_server().await? else {
        return Ok(());
    };
    let client = reqwest::Client::new();
    let token = common::signup(server, &client).await?;

    let res = client
        .get(format!(
            "{}/books?inStock=yes&minPrice=cheap&sortBy=secrets",
            server.base_url
        ))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = res.json::<Value>().await?;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["errors"]["inStock"], json!("inStock must be 'true' or 'false'"));
    assert_eq!(body["errors"]["minPrice"], json!("Minimum price must be a number"));
    assert_eq!(body["errors"]["sortBy"], json!("Cannot sort by 'secrets'"));

    Ok(())
}
