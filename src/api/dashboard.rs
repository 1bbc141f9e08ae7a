use crate::gateway::{ApiError, Gateway};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub users: usize,
    pub products: usize,
    pub blogs: usize,
    pub pending_products: usize,
}

/// Items of a listing response, wrapped or bare. Anything else counts as empty.
fn items(body: &Value) -> &[Value] {
    body.get("data")
        .unwrap_or(body)
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Headline counts. Products are counted from the first listing page, the
/// same page the products view opens on.
pub fn stats(gateway: &Gateway) -> Result<Stats, ApiError> {
    let users: Value = gateway.get("/users")?;
    let products: Value = gateway.get("/admin/products")?;
    let blogs: Value = gateway.get("/blogs")?;

    let products = items(&products);
    let pending_products = products
        .iter()
        .filter(|p| !is_truthy(p.get("is_approved")))
        .count();

    Ok(Stats {
        users: items(&users).len(),
        products: products.len(),
        blogs: items(&blogs).len(),
        pending_products,
    })
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty() && s != "0",
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::gateway;

    #[test]
    fn test_stats_counts() {
        let (gw, transport) = gateway();
        transport.reply(200, r#"{"data":[{"id":1},{"id":2}]}"#);
        transport.reply(
            200,
            r#"{"data":[{"id":1,"is_approved":true},{"id":2,"is_approved":false},{"id":3,"is_approved":0}],"meta":{"last_page":1}}"#,
        );
        transport.reply(200, r#"[{"id":1}]"#);

        let stats = stats(&gw).unwrap();
        assert_eq!(
            stats,
            Stats {
                users: 2,
                products: 3,
                blogs: 1,
                pending_products: 2,
            }
        );
    }

    #[test]
    fn test_non_array_payload_counts_zero() {
        let (gw, transport) = gateway();
        transport.reply(200, r#"{"data":{"unexpected":true}}"#);
        transport.reply(200, r#"{}"#);
        transport.reply(200, r#"null"#);

        assert_eq!(stats(&gw).unwrap(), Stats::default());
    }

    #[test]
    fn test_any_failure_fails_the_whole_fetch() {
        let (gw, transport) = gateway();
        transport.reply(200, r#"[]"#);
        transport.reply(500, r#"oops"#);
        assert_eq!(stats(&gw).unwrap_err().status(), Some(500));
    }
}
