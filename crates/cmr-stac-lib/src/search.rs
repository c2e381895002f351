//! Search orchestration: inbound query to CMR and back to STAC.
//!
//! [`SearchService`] owns one upstream client, the extension pipeline and the
//! schema cache. Every call is request-scoped; the service itself holds no
//! per-request state and can be shared between threads.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cmr::{CmrClient, CmrSearchResponse};
use crate::convert::granules::ResultPage;
use crate::convert::{
    collection_to_stac, convert_params, encode_stac_query, granules_to_feature_collection,
    is_collection_concept_id, stac_collection_to_cmr_params, try_convert_params, Params,
    Vocabulary,
};
use crate::error::{Error, Result};
use crate::extension::fields::FIELDS_PARAM;
use crate::extension::{ContextInput, ExtensionPipeline, FieldsSelection, FormatOptions};
use crate::settings::Settings;
use crate::stac::{create_provider_catalog, create_root_catalog, Catalog};
use crate::validator::{SchemaName, SchemaValidatorCache};

const PAGE_SIZE_PARAM: &str = "page_size";
const PAGE_NUM_PARAM: &str = "page_num";
const PROVIDER_PARAM: &str = "provider";
const COLLECTION_ID_PARAM: &str = "collection_concept_id";

/// CMR parameters produced for one inbound request, plus what the format
/// stage needs later.
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub cmr_params: Params,
    pub fields: Option<FieldsSelection>,
}

impl Translation {
    /// Requested page size, if any.
    pub fn page_size(&self) -> Option<u64> {
        self.cmr_params.get(PAGE_SIZE_PARAM).and_then(as_u64)
    }

    /// Requested page number; the first page when absent.
    pub fn page_num(&self) -> u64 {
        self.cmr_params
            .get(PAGE_NUM_PARAM)
            .and_then(as_u64)
            .unwrap_or(1)
    }
}

/// A provider catalog and the STAC collections it links to.
#[derive(Debug, Clone)]
pub struct ProviderCollections {
    pub catalog: Catalog,
    pub collections: Vec<Catalog>,
}

impl ProviderCollections {
    /// The provider catalog with its collections embedded under `collections`.
    pub fn to_value(&self) -> Result<Value> {
        let mut document = self.catalog.to_value()?;
        let collections = self
            .collections
            .iter()
            .map(Catalog::to_value)
            .collect::<Result<Vec<_>>>()?;
        document["collections"] = Value::Array(collections);
        Ok(document)
    }
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// The name under which the inbound vocabulary carries the page number.
fn inbound_page_key(vocabulary: Vocabulary) -> &'static str {
    match vocabulary {
        Vocabulary::StacSearch | Vocabulary::StacQuery => "page",
        Vocabulary::Wfs => PAGE_NUM_PARAM,
    }
}

#[derive(Debug)]
pub struct SearchService {
    settings: Settings,
    client: CmrClient,
    pipeline: ExtensionPipeline,
    validators: SchemaValidatorCache,
}

impl SearchService {
    /// Service talking to the internal CMR address from `settings`.
    pub fn new(settings: Settings) -> Result<Self> {
        let client = CmrClient::new(&settings)?;
        Ok(Self::with_client(settings, client))
    }

    pub fn with_client(settings: Settings, client: CmrClient) -> Self {
        let validators = SchemaValidatorCache::new(settings.schema_dir.clone());
        Self {
            settings,
            client,
            pipeline: ExtensionPipeline::standard(),
            validators,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn client(&self) -> &CmrClient {
        &self.client
    }

    pub fn validators(&self) -> &SchemaValidatorCache {
        &self.validators
    }

    fn convert(&self, vocabulary: Vocabulary, params: &Params) -> Result<Params> {
        if self.settings.throw_convert_param_errors {
            try_convert_params(vocabulary, params)
        } else {
            Ok(convert_params(vocabulary, params))
        }
    }

    /// Convert inbound parameters into CMR parameters. Query strings go
    /// through the internal search-body shape first.
    ///
    /// With a provider, collection ids that are not CMR concept ids are
    /// looked up as STAC ids (`short.vVERSION`); this is the only step that
    /// calls CMR. Ids that match nothing are dropped.
    pub fn translate(
        &self,
        vocabulary: Vocabulary,
        params: &Params,
        provider: Option<&str>,
    ) -> Result<Translation> {
        let inbound = match vocabulary {
            Vocabulary::StacQuery => self.convert(Vocabulary::StacQuery, params)?,
            Vocabulary::StacSearch | Vocabulary::Wfs => params.clone(),
        };
        let fields = inbound.get(FIELDS_PARAM).and_then(FieldsSelection::from_value);
        let converted = match vocabulary {
            Vocabulary::StacQuery | Vocabulary::StacSearch => {
                self.convert(Vocabulary::StacSearch, &inbound)?
            }
            Vocabulary::Wfs => self.convert(Vocabulary::Wfs, &inbound)?,
        };

        let mut cmr_params = self.pipeline.prepare(&converted)?;
        if let Some(limit) = cmr_params.get(PAGE_SIZE_PARAM).and_then(as_u64) {
            if limit > self.settings.max_limit {
                return Err(Error::invalid_parameter(
                    "limit",
                    format!("{limit} exceeds the maximum of {}", self.settings.max_limit),
                ));
            }
        }
        if let Some(provider) = provider {
            self.resolve_collection_ids(provider, &mut cmr_params)?;
            cmr_params.insert(PROVIDER_PARAM.to_string(), Value::from(provider));
        }

        let translation = Translation { cmr_params, fields };
        debug!(?vocabulary, cmr_params = ?translation.cmr_params, "translated request");
        Ok(translation)
    }

    fn resolve_collection_ids(&self, provider: &str, cmr_params: &mut Params) -> Result<()> {
        let ids: Vec<String> = match cmr_params.get(COLLECTION_ID_PARAM) {
            Some(Value::String(id)) => vec![id.clone()],
            Some(Value::Array(ids)) => ids
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => return Ok(()),
        };
        if ids.iter().all(|id| is_collection_concept_id(id)) {
            return Ok(());
        }

        let mut resolved = Vec::with_capacity(ids.len());
        for id in ids {
            if is_collection_concept_id(&id) {
                resolved.push(Value::String(id));
                continue;
            }
            match self.concept_id_for(provider, &id)? {
                Some(concept_id) => {
                    debug!(stac_id = %id, %concept_id, "resolved collection id");
                    resolved.push(Value::String(concept_id));
                }
                None => warn!(provider, stac_id = %id, "dropping unknown collection id"),
            }
        }
        if resolved.is_empty() {
            cmr_params.remove(COLLECTION_ID_PARAM);
        } else {
            cmr_params.insert(COLLECTION_ID_PARAM.to_string(), Value::Array(resolved));
        }
        Ok(())
    }

    fn concept_id_for(&self, provider: &str, stac_id: &str) -> Result<Option<String>> {
        let response = self
            .client
            .find_collections(&stac_collection_to_cmr_params(provider, stac_id))?;
        Ok(response
            .entries
            .first()
            .and_then(|entry| entry.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    /// Run an item search for `provider` and return the formatted
    /// `FeatureCollection`. With `validate` set every item is checked
    /// against the item schema before field projection.
    pub fn search_items(
        &self,
        provider: &str,
        vocabulary: Vocabulary,
        params: &Params,
        validate: bool,
    ) -> Result<Value> {
        let translation = self.translate(vocabulary, params, Some(provider))?;
        let response = self.client.find_granules(&translation.cmr_params)?;
        let context = ContextInput::from_search(&response, &translation.cmr_params);

        let path = format!("{}/{provider}/search", self.settings.stac_base_url);
        let query = encode_stac_query(params);
        let next_query = self.next_page_query(vocabulary, params, &translation, &response);
        let page = ResultPage {
            path: &path,
            query: &query,
            next_query: next_query.as_deref(),
        };

        let collection =
            granules_to_feature_collection(&self.settings, provider, &response.entries, &page)?;
        let document = collection.to_value()?;

        if validate {
            if let Some(Value::Array(features)) = document.get("features") {
                for feature in features {
                    self.validators.assert_valid(
                        SchemaName::Item,
                        feature,
                        self.settings.invalid_response_is_error,
                    )?;
                }
            }
        }

        let options = FormatOptions {
            fields: translation.fields,
            context: Some(context),
        };
        info!(
            provider,
            returned = context.returned,
            matched = context.matched,
            "item search complete"
        );
        Ok(self.pipeline.format(document, &options))
    }

    /// A next page exists when the current one came back full. The link
    /// speaks the STAC query-string vocabulary, whatever the inbound one.
    fn next_page_query(
        &self,
        vocabulary: Vocabulary,
        params: &Params,
        translation: &Translation,
        response: &CmrSearchResponse,
    ) -> Option<String> {
        let page_size = translation.page_size()?;
        let returned = response.entries.len() as u64;
        let seen = translation.page_num().saturating_mul(page_size);
        if returned < page_size || seen >= response.hits {
            return None;
        }
        let mut next = params.clone();
        next.insert(
            inbound_page_key(vocabulary).to_string(),
            Value::from(translation.page_num() + 1),
        );
        Some(encode_stac_query(&next))
    }

    /// Ids of every provider CMR knows about.
    pub fn providers(&self) -> Result<Vec<String>> {
        self.client.providers()
    }

    /// The root catalog with one child per provider.
    pub fn root_catalog(&self, providers: &[String]) -> Result<Catalog> {
        let mut catalog =
            create_root_catalog(&self.settings.stac_base_url, &self.settings.stac_version);
        for provider in providers {
            catalog.add_child(provider.as_str(), &format!("/{provider}"))?;
        }
        Ok(catalog)
    }

    /// Collections of one provider as STAC, linked from the provider catalog.
    pub fn provider_collections(
        &self,
        provider: &str,
        params: &Params,
        validate: bool,
    ) -> Result<ProviderCollections> {
        let mut cmr_params = self.convert(Vocabulary::Wfs, params)?;
        cmr_params.insert(PROVIDER_PARAM.to_string(), Value::from(provider));
        let response = self.client.find_collections(&cmr_params)?;

        let mut catalog = create_provider_catalog(
            &self.settings.stac_base_url,
            provider,
            &self.settings.stac_version,
        );
        let collections = response
            .entries
            .iter()
            .map(|entry| collection_to_stac(&self.settings, provider, entry))
            .collect::<Result<Vec<_>>>()?;
        for collection in &collections {
            let title = if collection.title.is_empty() {
                collection.id.as_str()
            } else {
                collection.title.as_str()
            };
            catalog.add_child(title, &format!("/collections/{}", collection.id))?;
        }

        let result = ProviderCollections {
            catalog,
            collections,
        };
        if validate {
            self.validate_collections(&result)?;
        }
        Ok(result)
    }

    /// Look up one collection by its STAC id (`short.vVERSION`).
    pub fn collection(&self, provider: &str, stac_id: &str) -> Result<Option<Catalog>> {
        let params = stac_collection_to_cmr_params(provider, stac_id);
        let response = self.client.find_collections(&params)?;
        response
            .entries
            .first()
            .map(|entry| collection_to_stac(&self.settings, provider, entry))
            .transpose()
    }

    fn validate_collections(&self, result: &ProviderCollections) -> Result<()> {
        let invalid_is_error = self.settings.invalid_response_is_error;
        self.validators.assert_valid(
            SchemaName::Catalog,
            &result.catalog.to_value()?,
            invalid_is_error,
        )?;
        for collection in &result.collections {
            self.validators.assert_valid(
                SchemaName::Collection,
                &collection.to_value()?,
                invalid_is_error,
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::cmr::CmrEndpoint;

    fn params(value: Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    fn offline_service(settings: Settings) -> SearchService {
        let client = CmrClient::with_endpoint(
            CmrEndpoint::parse("http://127.0.0.1:9").unwrap(),
            "test",
        )
        .unwrap();
        SearchService::with_client(settings, client)
    }

    #[test]
    fn translate_query_string_through_both_maps() {
        let service = offline_service(Settings::default());
        let translation = service
            .translate(
                Vocabulary::StacQuery,
                &params(json!({
                    "bbox": "-10,-5,10,5",
                    "limit": "20",
                    "sortby": "-properties.datetime",
                    "fields": "-geometry"
                })),
                Some("PROV"),
            )
            .unwrap();

        assert_eq!(
            translation.cmr_params,
            params(json!({
                "bounding_box": "-10,-5,10,5",
                "page_size": 20,
                "sort_key": ["-start_date"],
                "provider": "PROV"
            }))
        );
        assert_eq!(translation.fields.unwrap().exclude, vec!["geometry"]);
    }

    #[test]
    fn limit_above_maximum_is_rejected() {
        let settings = Settings::from_lookup(|key| {
            (key == "CMR_STAC_MAX_LIMIT").then(|| "50".to_string())
        });
        let service = offline_service(settings);
        let err = service
            .translate(Vocabulary::StacSearch, &params(json!({"limit": 51})), None)
            .unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn limit_is_checked_before_collection_lookup() {
        let settings = Settings::from_lookup(|key| {
            (key == "CMR_STAC_MAX_LIMIT").then(|| "50".to_string())
        });
        let service = offline_service(settings);
        let err = service
            .translate(
                Vocabulary::StacSearch,
                &params(json!({"limit": 51, "collections": ["MOD09GA.v006"]})),
                Some("PROV"),
            )
            .unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn concept_ids_translate_offline() {
        let service = offline_service(Settings::default());
        let translation = service
            .translate(
                Vocabulary::StacSearch,
                &params(json!({"collectionId": "C1-PROV", "collections": ["C2-PROV"]})),
                Some("PROV"),
            )
            .unwrap();
        assert_eq!(
            translation.cmr_params["collection_concept_id"],
            json!(["C1-PROV", "C2-PROV"])
        );
    }

    #[test]
    fn conversion_errors_propagate_only_when_configured() {
        let bad = params(json!({"limit": "many"}));

        let lenient = offline_service(Settings::default());
        let translation = lenient.translate(Vocabulary::StacQuery, &bad, None).unwrap();
        assert_eq!(translation.cmr_params["page_size"], "many");

        let strict = offline_service(Settings::from_lookup(|key| {
            (key == "THROW_CMR_CONVERT_PARAM_ERRORS").then(|| "true".to_string())
        }));
        assert!(strict.translate(Vocabulary::StacQuery, &bad, None).is_err());
    }

    #[test]
    fn root_catalog_links_providers() {
        let service = offline_service(Settings::default());
        let catalog = service
            .root_catalog(&["PROV1".to_string(), "PROV2".to_string()])
            .unwrap();
        let json = catalog.to_value().unwrap();
        assert_eq!(json["links"][2]["href"], "http://localhost:3000/stac/PROV1");
        assert_eq!(json["links"][3]["title"], "PROV2");
    }
}
