use serde::Deserialize;
use serde_json::Value;

/// An uploaded image asset as the content store records it.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SanityAsset {
    #[serde(rename = "_id")]
    pub id: String,
    pub url: String,
}

#[derive(Deserialize, Debug)]
pub struct UploadAssetResp {
    pub document: SanityAsset,
}

#[derive(Deserialize, Debug)]
pub struct MutateResp {
    #[serde(rename = "transactionId")]
    pub transaction_id: String,
    #[serde(default)]
    pub results: Vec<MutateResult>,
}

#[derive(Deserialize, Debug)]
pub struct MutateResult {
    pub id: String,
    #[serde(default)]
    pub document: Option<Value>,
}

#[derive(Deserialize, Debug)]
pub struct QueryResp<T> {
    pub result: T,
}
