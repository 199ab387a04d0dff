//! Entity store adapter. All access to the single `labor-pool-<stage>` table
//! goes through here: point gets, batch gets, filtered scans, puts, partial
//! updates and deletes, uniform over every record type.
//!
//! Store failures never cross this boundary: each operation logs the error
//! and reports a benign miss (`None`, empty list, `false`). The caller owns
//! the HTTP semantics.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::{AttributeValue, KeysAndAttributes};
use aws_sdk_dynamodb::Client as DynamoClient;

/// One stored entity type. `PREFIX` keys the partition (`USER#<id>` etc.);
/// item mapping is manual, tolerant of missing optional attributes.
pub trait DynamoRecord: Sized {
    const PREFIX: &'static str;

    fn id(&self) -> &str;
    fn from_item(item: &HashMap<String, AttributeValue>) -> Option<Self>;
    fn to_item(&self) -> HashMap<String, AttributeValue>;
}

pub fn pk_for<T: DynamoRecord>(id: &str) -> String {
    format!("{}#{}", T::PREFIX, id)
}

// ---- attribute helpers ----

pub fn s(value: &str) -> AttributeValue {
    AttributeValue::S(value.to_string())
}

pub fn n(value: i64) -> AttributeValue {
    AttributeValue::N(value.to_string())
}

pub fn get_s(item: &HashMap<String, AttributeValue>, key: &str) -> Option<String> {
    item.get(key).and_then(|v| v.as_s().ok()).cloned()
}

pub fn get_n(item: &HashMap<String, AttributeValue>, key: &str) -> i64 {
    item.get(key)
        .and_then(|v| v.as_n().ok())
        .and_then(|raw| raw.parse::<i64>().ok())
        .unwrap_or(0)
}

pub fn get_bool(item: &HashMap<String, AttributeValue>, key: &str) -> bool {
    item.get(key)
        .and_then(|v| v.as_bool().ok())
        .copied()
        .unwrap_or(false)
}

pub fn get_ss(item: &HashMap<String, AttributeValue>, key: &str) -> Vec<String> {
    item.get(key)
        .and_then(|v| v.as_ss().ok())
        .cloned()
        .unwrap_or_default()
}

pub fn get_map_s(
    item: &HashMap<String, AttributeValue>,
    key: &str,
) -> HashMap<String, String> {
    item.get(key)
        .and_then(|v| v.as_m().ok())
        .map(|m| {
            m.iter()
                .filter_map(|(k, v)| {
                    v.as_s().ok().map(|val| (k.clone(), val.clone()))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// DynamoDB rejects empty string sets, so the attribute is simply omitted
/// when there is nothing in it; readers default to empty.
pub fn set_attr(
    item: &mut HashMap<String, AttributeValue>,
    key: &str,
    values: &[String],
) {
    if !values.is_empty() {
        item.insert(key.to_string(), AttributeValue::Ss(values.to_vec()));
    }
}

// ---- operations ----

pub async fn get_record<T: DynamoRecord>(
    client: &DynamoClient,
    table_name: &str,
    id: &str,
) -> Option<T> {
    let pk = pk_for::<T>(id);
    let result = client
        .get_item()
        .table_name(table_name)
        .key("PK", s(&pk))
        .key("SK", s(&pk))
        .send()
        .await;

    match result {
        Ok(output) => output.item().and_then(T::from_item),
        Err(e) => {
            tracing::error!("Failed to get {}#{}: {}", T::PREFIX, id, e);
            None
        }
    }
}

/// Batch point lookup. Missing ids are silently omitted from the result;
/// DynamoDB caps a request at 100 keys, so the id list is chunked.
pub async fn batch_get_records<T: DynamoRecord>(
    client: &DynamoClient,
    table_name: &str,
    ids: &[String],
) -> Vec<T> {
    let mut records = Vec::new();

    for chunk in ids.chunks(100) {
        let mut keys = KeysAndAttributes::builder();
        for id in chunk {
            let pk = pk_for::<T>(id);
            let mut key = HashMap::new();
            key.insert("PK".to_string(), s(&pk));
            key.insert("SK".to_string(), s(&pk));
            keys = keys.keys(key);
        }
        let keys = match keys.build() {
            Ok(k) => k,
            Err(e) => {
                tracing::error!("Failed to build batch-get keys: {}", e);
                continue;
            }
        };

        let result = client
            .batch_get_item()
            .request_items(table_name, keys)
            .send()
            .await;

        match result {
            Ok(output) => {
                if let Some(responses) = output.responses() {
                    if let Some(items) = responses.get(table_name) {
                        records.extend(items.iter().filter_map(T::from_item));
                    }
                }
            }
            Err(e) => {
                tracing::error!("Failed to batch get {} records: {}", T::PREFIX, e);
            }
        }
    }

    records
}

/// Set-membership filter: every record of the type whose set attribute
/// contains the given value. Unordered, linear over the collection.
/// `contains` on a plain string attribute is a substring match, so scalar
/// lookups go through [`scan_equals`] instead.
pub async fn scan_contains<T: DynamoRecord>(
    client: &DynamoClient,
    table_name: &str,
    attr: &str,
    value: &str,
) -> Vec<T> {
    scan_records(client, table_name, ScanFilter::Contains(attr, value)).await
}

/// Exact-match filter on a scalar attribute. A substring filter on
/// `ownerUrn` would also match ids that extend the wanted one
/// (`urn:org:acme` vs `urn:org:acme-freight`), and org ids are name slugs,
/// so prefix collisions are realistic.
pub async fn scan_equals<T: DynamoRecord>(
    client: &DynamoClient,
    table_name: &str,
    attr: &str,
    value: &str,
) -> Vec<T> {
    scan_records(client, table_name, ScanFilter::Equals(attr, value)).await
}

/// Every record of the type. Unordered.
pub async fn scan_all<T: DynamoRecord>(
    client: &DynamoClient,
    table_name: &str,
) -> Vec<T> {
    scan_records(client, table_name, ScanFilter::All).await
}

#[derive(Clone, Copy)]
enum ScanFilter<'a> {
    All,
    Contains(&'a str, &'a str),
    Equals(&'a str, &'a str),
}

fn filter_expression(filter: ScanFilter<'_>) -> &'static str {
    match filter {
        ScanFilter::All => "begins_with(#pk, :prefix)",
        ScanFilter::Contains(..) => "begins_with(#pk, :prefix) AND contains(#attr, :val)",
        ScanFilter::Equals(..) => "begins_with(#pk, :prefix) AND #attr = :val",
    }
}

async fn scan_records<T: DynamoRecord>(
    client: &DynamoClient,
    table_name: &str,
    filter: ScanFilter<'_>,
) -> Vec<T> {
    let mut records = Vec::new();
    let mut start_key: Option<HashMap<String, AttributeValue>> = None;

    loop {
        let mut req = client
            .scan()
            .table_name(table_name)
            .expression_attribute_names("#pk", "PK")
            .expression_attribute_values(":prefix", s(&format!("{}#", T::PREFIX)));

        if let ScanFilter::Contains(attr, value) | ScanFilter::Equals(attr, value) = filter
        {
            req = req
                .expression_attribute_names("#attr", attr)
                .expression_attribute_values(":val", s(value));
        }
        req = req.filter_expression(filter_expression(filter));

        if let Some(key) = start_key.take() {
            req = req.set_exclusive_start_key(Some(key));
        }

        match req.send().await {
            Ok(output) => {
                records.extend(output.items().iter().filter_map(T::from_item));
                match output.last_evaluated_key() {
                    Some(key) if !key.is_empty() => {
                        start_key = Some(key.clone());
                    }
                    _ => break,
                }
            }
            Err(e) => {
                tracing::error!("Failed to scan {} records: {}", T::PREFIX, e);
                break;
            }
        }
    }

    records
}

pub async fn put_record<T: DynamoRecord>(
    client: &DynamoClient,
    table_name: &str,
    record: &T,
) -> bool {
    let pk = pk_for::<T>(record.id());
    let mut item = record.to_item();
    item.insert("PK".to_string(), s(&pk));
    item.insert("SK".to_string(), s(&pk));

    let result = client
        .put_item()
        .table_name(table_name)
        .set_item(Some(item))
        .send()
        .await;

    match result {
        Ok(_) => true,
        Err(e) => {
            tracing::error!("Failed to put {}#{}: {}", T::PREFIX, record.id(), e);
            false
        }
    }
}

pub async fn delete_record<T: DynamoRecord>(
    client: &DynamoClient,
    table_name: &str,
    id: &str,
) -> bool {
    let pk = pk_for::<T>(id);
    let result = client
        .delete_item()
        .table_name(table_name)
        .key("PK", s(&pk))
        .key("SK", s(&pk))
        .send()
        .await;

    match result {
        Ok(_) => true,
        Err(e) => {
            tracing::error!("Failed to delete {}#{}: {}", T::PREFIX, id, e);
            false
        }
    }
}

/// Partial update from explicitly present fields only. Attribute names are
/// always aliased; several of ours (name, status, location) are DynamoDB
/// reserved words. Returns the updated record.
pub async fn update_record_fields<T: DynamoRecord>(
    client: &DynamoClient,
    table_name: &str,
    id: &str,
    fields: Vec<(&str, AttributeValue)>,
) -> Option<T> {
    if fields.is_empty() {
        return get_record(client, table_name, id).await;
    }

    let pk = pk_for::<T>(id);
    let mut expr_parts = Vec::new();
    let mut builder = client
        .update_item()
        .table_name(table_name)
        .key("PK", s(&pk))
        .key("SK", s(&pk));

    for (i, (attr, value)) in fields.into_iter().enumerate() {
        let name = format!("#f{}", i);
        let placeholder = format!(":v{}", i);
        expr_parts.push(format!("{} = {}", name, placeholder));
        builder = builder
            .expression_attribute_names(name, attr)
            .expression_attribute_values(placeholder, value);
    }
    expr_parts.push("#updated = :updated".to_string());
    builder = builder
        .expression_attribute_names("#updated", "updatedAtMs")
        .expression_attribute_values(
            ":updated",
            n(chrono::Utc::now().timestamp_millis()),
        );

    let result = builder
        .update_expression(format!("SET {}", expr_parts.join(", ")))
        .return_values(aws_sdk_dynamodb::types::ReturnValue::AllNew)
        .send()
        .await;

    match result {
        Ok(output) => output.attributes().and_then(T::from_item),
        Err(e) => {
            tracing::error!("Failed to update {}#{}: {}", T::PREFIX, id, e);
            None
        }
    }
}

/// Atomic membership add on a string-set attribute (`ADD attr :v`).
/// Idempotent: adding an id already in the set is a no-op.
pub async fn add_to_set<T: DynamoRecord>(
    client: &DynamoClient,
    table_name: &str,
    id: &str,
    attr: &str,
    value: &str,
) -> bool {
    let pk = pk_for::<T>(id);
    let result = client
        .update_item()
        .table_name(table_name)
        .key("PK", s(&pk))
        .key("SK", s(&pk))
        .update_expression("ADD #attr :val SET #updated = :updated")
        .expression_attribute_names("#attr", attr)
        .expression_attribute_names("#updated", "updatedAtMs")
        .expression_attribute_values(
            ":val",
            AttributeValue::Ss(vec![value.to_string()]),
        )
        .expression_attribute_values(
            ":updated",
            n(chrono::Utc::now().timestamp_millis()),
        )
        .send()
        .await;

    match result {
        Ok(_) => true,
        Err(e) => {
            tracing::error!(
                "Failed to add {} to {} on {}#{}: {}",
                value,
                attr,
                T::PREFIX,
                id,
                e
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_filters_match_exactly_not_by_substring() {
        assert_eq!(
            filter_expression(ScanFilter::Equals("ownerUrn", "urn:org:acme")),
            "begins_with(#pk, :prefix) AND #attr = :val"
        );
        assert_eq!(
            filter_expression(ScanFilter::Contains("assignedTo", "urn:user:u1")),
            "begins_with(#pk, :prefix) AND contains(#attr, :val)"
        );
        assert_eq!(filter_expression(ScanFilter::All), "begins_with(#pk, :prefix)");
    }

    #[test]
    fn set_attr_omits_empty_sets() {
        let mut item = HashMap::new();
        set_attr(&mut item, "friends", &[]);
        assert!(item.is_empty());

        set_attr(&mut item, "friends", &["acme".to_string()]);
        assert_eq!(get_ss(&item, "friends"), vec!["acme".to_string()]);
    }

    #[test]
    fn numeric_helper_defaults_to_zero() {
        let mut item = HashMap::new();
        assert_eq!(get_n(&item, "createdAtMs"), 0);
        item.insert("createdAtMs".to_string(), n(99));
        assert_eq!(get_n(&item, "createdAtMs"), 99);
        item.insert("createdAtMs".to_string(), s("not-a-number"));
        assert_eq!(get_n(&item, "createdAtMs"), 0);
    }

    #[test]
    fn map_helper_keeps_string_entries_only() {
        let mut roles = HashMap::new();
        roles.insert("acme".to_string(), s("manager"));
        roles.insert("bogus".to_string(), n(1));
        let mut item = HashMap::new();
        item.insert("orgRoles".to_string(), AttributeValue::M(roles));

        let parsed = get_map_s(&item, "orgRoles");
        assert_eq!(parsed.get("acme").map(String::as_str), Some("manager"));
        assert!(!parsed.contains_key("bogus"));
    }
}
