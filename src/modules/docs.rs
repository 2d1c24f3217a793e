//! Builders for the OpenAPI fragments the catalog modules publish.

use serde_json::{json, Map, Value};

pub fn schema_ref(name: &str) -> Value {
    json!({ "$ref": format!("#/components/schemas/{}", name) })
}

fn json_content(schema: Value) -> Value {
    json!({ "application/json": { "schema": schema } })
}

pub fn body(description: &str, schema: Value) -> Value {
    json!({ "description": description, "content": json_content(schema) })
}

pub fn request_body(schema: &str) -> Value {
    json!({ "required": true, "content": json_content(schema_ref(schema)) })
}

pub fn error(description: &str) -> Value {
    body(description, schema_ref("ErrorResponse"))
}

pub fn path_param(name: &str, description: &str) -> Value {
    json!({
        "name": name,
        "in": "path",
        "required": true,
        "description": description,
        "schema": { "type": "string", "format": "uuid" }
    })
}

pub fn query_param(name: &str, kind: &str, description: &str) -> Value {
    json!({
        "name": name,
        "in": "query",
        "required": false,
        "description": description,
        "schema": { "type": kind }
    })
}

pub fn paging_params() -> Vec<Value> {
    vec![
        query_param("page", "integer", "1-based page number"),
        query_param("limit", "integer", "Items per page"),
    ]
}

/// Header carrying the caller identity forwarded by the gateway
pub fn identity_header() -> Value {
    json!({
        "name": "x-user-id",
        "in": "header",
        "required": true,
        "schema": { "type": "string" }
    })
}

pub fn page_of(item: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "items": { "type": "array", "items": schema_ref(item) },
            "pagination": schema_ref("Pagination")
        },
        "required": ["items", "pagination"]
    })
}

/// One operation object. `responses` is a list of `(status, response)`.
pub fn operation(
    summary: &str,
    tag: &str,
    parameters: Vec<Value>,
    request: Option<Value>,
    responses: Vec<(&str, Value)>,
) -> Value {
    let mut op = json!({
        "summary": summary,
        "tags": [tag],
        "parameters": parameters,
    });
    if let Some(request) = request {
        op["requestBody"] = request;
    }
    let responses: Map<String, Value> = responses
        .into_iter()
        .map(|(status, response)| (status.to_string(), response))
        .collect();
    op["responses"] = Value::Object(responses);
    op
}

pub fn health(tag: &str) -> Value {
    json!({
        "get": {
            "summary": format!("{} health check", tag),
            "tags": [tag],
            "responses": {
                "200": {
                    "description": "OK",
                    "content": { "text/plain": { "schema": { "type": "string" } } }
                }
            }
        }
    })
}

/// `components` object with the shared schemas plus the module's own
pub fn components(local: Value) -> Value {
    let mut schemas = shared_schemas();
    if let (Some(all), Value::Object(local)) = (schemas.as_object_mut(), local) {
        all.extend(local);
    }
    json!({ "schemas": schemas })
}

/// Schemas referenced by more than one module
fn shared_schemas() -> Value {
    json!({
        "Pagination": {
            "type": "object",
            "properties": {
                "currentPage": { "type": "integer" },
                "totalPages": { "type": "integer" },
                "totalItems": { "type": "integer" },
                "hasNext": { "type": "boolean" },
                "hasPrev": { "type": "boolean" }
            },
            "required": ["currentPage", "totalPages", "totalItems", "hasNext", "hasPrev"]
        },
        "RatingSummary": {
            "type": "object",
            "properties": {
                "averageRating": { "type": "number", "minimum": 0, "maximum": 5 },
                "totalReviews": { "type": "integer", "minimum": 0 }
            },
            "required": ["averageRating", "totalReviews"]
        },
        "Book": {
            "type": "object",
            "properties": {
                "id": { "type": "string", "format": "uuid" },
                "title": { "type": "string", "maxLength": 200 },
                "author": { "type": "string", "maxLength": 100 },
                "genre": { "type": "string", "maxLength": 50 },
                "description": { "type": "string", "maxLength": 2000 },
                "publishedDate": { "type": "string", "format": "date" },
                "isbn": { "type": "string" },
                "pageCount": { "type": "integer", "minimum": 1 },
                "language": { "type": "string" },
                "averageRating": { "type": "number" },
                "totalReviews": { "type": "integer" },
                "createdBy": { "type": "string" },
                "createdAt": { "type": "string", "format": "date-time" },
                "updatedAt": { "type": "string", "format": "date-time" }
            },
            "required": [
                "id", "title", "author", "genre", "description", "publishedDate",
                "language", "averageRating", "totalReviews", "createdBy",
                "createdAt", "updatedAt"
            ]
        },
        "Review": {
            "type": "object",
            "properties": {
                "id": { "type": "string", "format": "uuid" },
                "bookId": { "type": "string", "format": "uuid" },
                "userId": { "type": "string" },
                "rating": { "type": "integer", "minimum": 1, "maximum": 5 },
                "comment": { "type": "string", "minLength": 10, "maxLength": 1000 },
                "helpful": { "type": "integer" },
                "createdAt": { "type": "string", "format": "date-time" },
                "updatedAt": { "type": "string", "format": "date-time" }
            },
            "required": [
                "id", "bookId", "userId", "rating", "comment", "helpful",
                "createdAt", "updatedAt"
            ]
        }
    })
}
