use function_adapter::RECORDS;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use serverless_web::{Configuration, DispatchError, PathParams, ProxyRequest, ProxyResponse, Router, RouterBuilder};
use tracing::{debug, info};
use uuid::Uuid;

use crate::EVENT_KIND_HEADER;

const BREEDS: [&str; 8] = [
    "Afghan Hound",
    "Beagle",
    "Bernese Mountain Dog",
    "Bloodhound",
    "Dalmatian",
    "Jack Russell Terrier",
    "Norwegian Elkhound",
    "Whippet",
];

const NAMES: [&str; 12] = [
    "Bailey", "Bella", "Max", "Lucy", "Charlie", "Molly", "Buddy", "Daisy", "Rocky", "Maggie", "Jake", "Sophie",
];

/// How many pets `GET /pets` returns without a `limit`.
const DEFAULT_PAGE: usize = 10;

/// Larger `limit` values are clamped to this.
const MAX_PAGE: usize = 100;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    /// Assigned by the store if the client didn't send one.
    #[serde(default)]
    pub id: String,
    pub breed: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
}

impl Pet {
    /// A made-up pet. The same `seed` gives the same breed and name.
    fn sample(id: String, seed: usize) -> Self {
        Self {
            id,
            breed: BREEDS[seed % BREEDS.len()].to_owned(),
            name: NAMES[seed % NAMES.len()].to_owned(),
            date_of_birth: None,
        }
    }
}

/// `GET /pets?limit=n`, at most [MAX_PAGE] pets.
fn list_pets(req: &ProxyRequest, _: &PathParams, resp: &mut ProxyResponse) -> Result<(), DispatchError> {
    let limit = match req.parameter("limit") {
        Some(limit) => limit
            .parse::<usize>()
            .map_err(|_| DispatchError::failed(format!("Invalid limit: {limit}")))?
            .min(MAX_PAGE),
        None => DEFAULT_PAGE,
    };
    debug!("Listing {limit} pets");

    let pets = (0..limit)
        .map(|i| Pet::sample(Uuid::new_v4().to_string(), i))
        .collect::<Vec<_>>();

    resp.set_content_type("application/json");
    serde_json::to_writer(resp, &pets).map_err(DispatchError::from_error)
}

/// `GET /pets/{id}`. Any valid UUID is a known pet.
fn get_pet(_: &ProxyRequest, params: &PathParams, resp: &mut ProxyResponse) -> Result<(), DispatchError> {
    let id = params
        .get("id")
        .and_then(|id| Uuid::parse_str(id).ok())
        .ok_or_else(|| DispatchError::not_found("No such Dog"))?;

    let pet = Pet::sample(id.to_string(), id.as_bytes()[0] as usize);

    resp.set_content_type("application/json");
    serde_json::to_writer(resp, &pet).map_err(DispatchError::from_error)
}

/// `POST /pets` stores nothing and returns the pet back with an ID.
fn create_pet(req: &ProxyRequest, _: &PathParams, resp: &mut ProxyResponse) -> Result<(), DispatchError> {
    let mut pet: Pet = serde_json::from_slice(req.content())?;
    if pet.id.is_empty() {
        pet.id = Uuid::new_v4().to_string();
    }
    info!("New pet: {} ({})", pet.name, pet.id);

    resp.set_content_type("application/json");
    serde_json::to_writer(resp, &pet).map_err(DispatchError::from_error)
}

/// `POST /events` receives the payloads that did not come from API Gateway
/// and replies with a count of their records.
fn summarize_event(req: &ProxyRequest, _: &PathParams, resp: &mut ProxyResponse) -> Result<(), DispatchError> {
    let kind = req.header(EVENT_KIND_HEADER).unwrap_or("unknown");
    let event: Value = serde_json::from_slice(req.content())?;

    let records = event
        .get(RECORDS)
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or_default();
    if records == 0 {
        return Err(DispatchError::not_found(format!("No records in the {kind} event")));
    }
    info!("{kind} event with {records} records");

    resp.set_content_type("application/json");
    serde_json::to_writer(resp, &json!({ "kind": kind, "records": records })).map_err(DispatchError::from_error)
}

/// The pet store routes.
pub struct PetStore;

impl Configuration for PetStore {
    fn configure(&self, router: &mut RouterBuilder) {
        router
            .get("/pets", list_pets)
            .get("/pets/{id}", get_pet)
            .post("/pets", create_pet)
            .post("/events", summarize_event)
            .get("/foo", |_, _, _| Err(DispatchError::access_denied("Can't touch this")));
    }
}

/// Reports unknown paths as 404 with the path in the message.
pub struct PetStoreErrors;

impl Configuration for PetStoreErrors {
    fn configure(&self, router: &mut RouterBuilder) {
        router.error_handler(|error, req| match error {
            DispatchError::NoRoute { method, path } => {
                debug!("No route for {method} {path}");
                DispatchError::not_found(format!("Nothing here: {}", req.path()))
            }
            other => other,
        });
    }
}

/// The complete pet store application.
pub fn router() -> Router {
    Router::from_configurations(&[&PetStore, &PetStoreErrors])
}
