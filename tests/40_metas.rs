// DB-backed goal scenarios, centered on multi-statement atomicity.
// These skip when DATABASE_URL is unset.

mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

struct Fixtures {
    vendedor_id: String,
    produto_a: String,
    produto_b: String,
}

/// Build a branch, a seller and two products through the API
async fn setup(
    server: &common::TestServer,
    token: &str,
    client: &reqwest::Client,
) -> Result<Fixtures> {
    let suffix = common::unique_suffix();

    let res = client
        .post(format!("{}/api/filiais", server.base_url))
        .bearer_auth(token)
        .json(&json!({"codigo": format!("F-{}", suffix), "nome": "Loja Metas"}))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::CREATED, "filial setup failed");
    let filial = res.json::<serde_json::Value>().await?;
    let filial_id = filial["data"]["id"].as_str().unwrap().to_string();

    let res = client
        .post(format!("{}/api/vendedores", server.base_url))
        .bearer_auth(token)
        .json(&json!({
            "nome": "Vendedor Metas",
            "email": format!("v-{}@varejo.test", suffix),
            "cpf": format!("cpf-{}", suffix),
            "filial_id": filial_id,
        }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::CREATED, "vendedor setup failed");
    let vendedor = res.json::<serde_json::Value>().await?;
    let vendedor_id = vendedor["data"]["id"].as_str().unwrap().to_string();

    let mut produtos = Vec::new();
    for i in 0..2 {
        let res = client
            .post(format!("{}/api/produtos", server.base_url))
            .bearer_auth(token)
            .json(&json!({
                "codigo": format!("P-{}-{}", suffix, i),
                "descricao": format!("Produto {}", i),
                "preco": 19.9,
            }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "produto setup failed");
        let produto = res.json::<serde_json::Value>().await?;
        produtos.push(produto["data"]["id"].as_str().unwrap().to_string());
    }

    Ok(Fixtures {
        vendedor_id,
        produto_b: produtos.pop().unwrap(),
        produto_a: produtos.pop().unwrap(),
    })
}

async fn meta_counts(pool: &PgPool, vendedor_id: &str) -> Result<(i64, i64)> {
    let vendedor: Uuid = vendedor_id.parse()?;
    let (metas,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM metas WHERE vendedor_id = $1")
        .bind(vendedor)
        .fetch_one(pool)
        .await?;
    let (itens,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM meta_itens i \
         JOIN metas m ON m.id = i.meta_id WHERE m.vendedor_id = $1",
    )
    .bind(vendedor)
    .fetch_one(pool)
    .await?;
    Ok((metas, itens))
}

#[tokio::test]
async fn failed_item_write_leaves_no_goal_and_no_items() -> Result<()> {
    let Some(pool) = common::test_pool().await? else {
        return Ok(());
    };
    let server = common::ensure_server().await?;
    let token = common::login(server, &pool).await?;
    let client = reqwest::Client::new();
    let fx = setup(server, &token, &client).await?;

    // Both items reference a real product, so the pre-checks pass and the
    // header insert succeeds; the second item then violates the per-goal
    // uniqueness constraint mid-transaction and everything rolls back.
    let res = client
        .post(format!("{}/api/metas", server.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "vendedor_id": fx.vendedor_id,
            "mes": "2026-09",
            "valor_total": 5000.0,
            "itens": [
                {"produto_id": fx.produto_a, "quantidade": 5},
                {"produto_id": fx.produto_a, "quantidade": 3},
            ],
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let (metas, itens) = meta_counts(&pool, &fx.vendedor_id).await?;
    assert_eq!(metas, 0, "rolled-back goal header must not persist");
    assert_eq!(itens, 0, "rolled-back goal items must not persist");
    Ok(())
}

#[tokio::test]
async fn missing_product_reference_is_404_with_nothing_written() -> Result<()> {
    let Some(pool) = common::test_pool().await? else {
        return Ok(());
    };
    let server = common::ensure_server().await?;
    let token = common::login(server, &pool).await?;
    let client = reqwest::Client::new();
    let fx = setup(server, &token, &client).await?;

    let res = client
        .post(format!("{}/api/metas", server.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "vendedor_id": fx.vendedor_id,
            "mes": "2026-09",
            "valor_total": 5000.0,
            "itens": [
                {"produto_id": fx.produto_a, "quantidade": 5},
                {"produto_id": Uuid::new_v4().to_string(), "quantidade": 3},
            ],
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let (metas, itens) = meta_counts(&pool, &fx.vendedor_id).await?;
    assert_eq!(metas, 0);
    assert_eq!(itens, 0);
    Ok(())
}

#[tokio::test]
async fn goal_with_items_commits_as_a_unit() -> Result<()> {
    let Some(pool) = common::test_pool().await? else {
        return Ok(());
    };
    let server = common::ensure_server().await?;
    let token = common::login(server, &pool).await?;
    let client = reqwest::Client::new();
    let fx = setup(server, &token, &client).await?;

    let res = client
        .post(format!("{}/api/metas", server.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "vendedor_id": fx.vendedor_id,
            "mes": "2026-10",
            "valor_total": 8000.0,
            "itens": [
                {"produto_id": fx.produto_a, "quantidade": 5},
                {"produto_id": fx.produto_b, "quantidade": 2},
            ],
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created = res.json::<serde_json::Value>().await?;
    let meta_id = created["data"]["id"].as_str().unwrap().to_string();

    let (metas, itens) = meta_counts(&pool, &fx.vendedor_id).await?;
    assert_eq!(metas, 1);
    assert_eq!(itens, 2);

    // And the read side returns the header with both items
    let res = client
        .get(format!("{}/api/metas/{}", server.base_url, meta_id))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["data"]["itens"].as_array().unwrap().len(), 2);
    Ok(())
}
