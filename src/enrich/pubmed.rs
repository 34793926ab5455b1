//! PubMed enrichment backend using the NCBI E-utilities API.

use async_trait::async_trait;
use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::PubMedConfig;
use crate::enrich::{EnrichError, Enricher};
use crate::models::{ExtractionStatus, ReferenceRecord};
use crate::utils::HttpClient;

/// Minimum Jaro-Winkler similarity between the extracted title and the
/// candidate's title before a merge is accepted
const TITLE_SIMILARITY_THRESHOLD: f64 = 0.6;

/// PubMed enrichment client
///
/// Looks up a single candidate via `esearch.fcgi` (JSON id list), fetches
/// its full record via `efetch.fcgi` (XML), and merges the fetched fields
/// over the extracted ones.
#[derive(Debug, Clone)]
pub struct PubMedEnricher {
    client: HttpClient,
    config: PubMedConfig,
}

/// Fields pulled out of one efetch article record
#[derive(Debug, Clone, Default, PartialEq)]
struct PubMedArticle {
    title: String,
    authors: Vec<String>,
    year: Option<i32>,
    journal: String,
    volume: String,
    issue: String,
    pages: String,
    doi: String,
}

impl PubMedEnricher {
    /// Create a new enricher from an explicit configuration value
    pub fn new(config: PubMedConfig) -> Result<Self, EnrichError> {
        let client = HttpClient::with_timeout(Duration::from_secs(config.timeout_secs))?;
        Ok(Self { client, config })
    }

    /// Free-text search query: title plus year when present
    fn build_query(record: &ReferenceRecord) -> String {
        let mut parts = vec![record.title.trim().to_string()];
        if let Some(year) = record.year {
            parts.push(year.to_string());
        }
        parts.retain(|p| !p.is_empty());
        parts.join(" ")
    }

    /// Build E-utilities search URL
    fn search_url(&self, query: &str) -> String {
        format!(
            "{}/esearch.fcgi?db=pubmed&term={}&retmax=1&retmode=json",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(query)
        )
    }

    /// Build E-utilities fetch URL for one PMID
    fn fetch_url(&self, pmid: &str) -> String {
        format!(
            "{}/efetch.fcgi?db=pubmed&id={}&retmode=xml&rettype=medline",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(pmid)
        )
    }

    async fn get_text(&self, url: &str, what: &str) -> Result<String, EnrichError> {
        let response = self.client.client().get(url).send().await?;

        if !response.status().is_success() {
            return Err(EnrichError::Api(format!(
                "{} returned status {}",
                what,
                response.status()
            )));
        }

        Ok(response.text().await?)
    }

    /// Parse the esearch JSON id list
    fn parse_search_response(json: &str) -> Result<Vec<String>, EnrichError> {
        #[derive(Debug, Deserialize)]
        struct ESearchResponse {
            esearchresult: Option<ESearchResult>,
        }

        #[derive(Debug, Deserialize)]
        struct ESearchResult {
            #[serde(default)]
            idlist: Vec<String>,
        }

        let parsed: ESearchResponse = serde_json::from_str(json)?;
        Ok(parsed
            .esearchresult
            .map(|result| result.idlist)
            .unwrap_or_default())
    }

    /// Parse the efetch XML into the first article's fields
    fn parse_fetch_response(xml: &str) -> Result<Option<PubMedArticle>, EnrichError> {
        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct PubmedArticleSet {
            #[serde(rename = "PubmedArticle", default)]
            articles: Vec<PubmedArticleXml>,
        }

        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct PubmedArticleXml {
            MedlineCitation: Option<MedlineCitation>,
            PubmedData: Option<PubmedData>,
        }

        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct MedlineCitation {
            Article: Option<Article>,
        }

        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct Article {
            Journal: Option<Journal>,
            ArticleTitle: Option<Text>,
            Pagination: Option<Pagination>,
            AuthorList: Option<AuthorList>,
        }

        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct Journal {
            Title: Option<Text>,
            JournalIssue: Option<JournalIssue>,
        }

        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct JournalIssue {
            Volume: Option<Text>,
            Issue: Option<Text>,
            PubDate: Option<PubDate>,
        }

        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct PubDate {
            Year: Option<Text>,
        }

        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct Pagination {
            MedlinePgn: Option<Text>,
        }

        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct AuthorList {
            #[serde(rename = "Author", default)]
            authors: Vec<Author>,
        }

        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct Author {
            LastName: Option<Text>,
            Initials: Option<Text>,
            CollectiveName: Option<Text>,
        }

        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct PubmedData {
            ArticleIdList: Option<ArticleIdList>,
        }

        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct ArticleIdList {
            #[serde(rename = "ArticleId", default)]
            ids: Vec<ArticleId>,
        }

        #[derive(Debug, Deserialize)]
        struct ArticleId {
            #[serde(rename = "@IdType")]
            id_type: String,
            #[serde(rename = "$text", default)]
            value: String,
        }

        #[derive(Debug, Deserialize)]
        struct Text {
            #[serde(rename = "$text", default)]
            value: String,
        }

        let result: PubmedArticleSet = from_str(xml)
            .map_err(|e| EnrichError::Parse(format!("efetch XML: {}", e)))?;

        let Some(first) = result.articles.into_iter().next() else {
            return Ok(None);
        };

        let article = first.MedlineCitation.and_then(|m| m.Article);
        let Some(article) = article else {
            return Ok(None);
        };

        let title = article
            .ArticleTitle
            .map(|t| t.value)
            .unwrap_or_default();

        let authors = article
            .AuthorList
            .map(|list| {
                list.authors
                    .into_iter()
                    .filter_map(|author| {
                        if let Some(collective) = author.CollectiveName {
                            return Some(collective.value);
                        }
                        let last = author.LastName?.value;
                        let initials = author
                            .Initials
                            .map(|i| i.value)
                            .unwrap_or_default();
                        Some(format!("{} {}", last, initials).trim().to_string())
                    })
                    .filter(|name| !name.is_empty())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let (journal, volume, issue, year) = article
            .Journal
            .map(|journal| {
                let title = journal.Title.map(|t| t.value).unwrap_or_default();
                let (volume, issue, year) = journal
                    .JournalIssue
                    .map(|ji| {
                        let volume = ji.Volume.map(|v| v.value).unwrap_or_default();
                        let issue = ji.Issue.map(|i| i.value).unwrap_or_default();
                        let year = ji
                            .PubDate
                            .and_then(|pd| pd.Year)
                            .and_then(|y| y.value.trim().parse::<i32>().ok());
                        (volume, issue, year)
                    })
                    .unwrap_or_default();
                (title, volume, issue, year)
            })
            .unwrap_or_default();

        let pages = article
            .Pagination
            .and_then(|p| p.MedlinePgn)
            .map(|p| p.value)
            .unwrap_or_default();

        let doi = first
            .PubmedData
            .and_then(|pd| pd.ArticleIdList)
            .map(|list| list.ids)
            .unwrap_or_default()
            .into_iter()
            .find(|id| id.id_type == "doi")
            .map(|id| id.value)
            .unwrap_or_default();

        Ok(Some(PubMedArticle {
            title,
            authors,
            year,
            journal,
            volume,
            issue,
            pages,
            doi,
        }))
    }

    /// Accept the candidate only when the titles approximately match.
    /// An empty extracted title cannot be compared, so it always passes.
    fn titles_match(extracted: &str, candidate: &str) -> bool {
        let extracted = extracted.trim().to_lowercase();
        if extracted.is_empty() {
            return true;
        }
        let candidate = candidate.trim().to_lowercase();
        strsim::jaro_winkler(&extracted, &candidate) >= TITLE_SIMILARITY_THRESHOLD
    }

    /// Merge the fetched article over the extracted record. Fetched fields
    /// win when present; extracted values back-fill the gaps.
    fn merge(record: &ReferenceRecord, article: PubMedArticle) -> ReferenceRecord {
        let doi = non_empty_or(article.doi, &record.doi);
        let url = if doi.trim().is_empty() {
            record.url.clone()
        } else {
            format!("https://doi.org/{}", doi.trim())
        };

        ReferenceRecord {
            title: non_empty_or(article.title, &record.title),
            authors: if article.authors.is_empty() {
                record.authors.clone()
            } else {
                article.authors
            },
            year: article.year.or(record.year),
            journal: non_empty_or(article.journal, &record.journal),
            volume: non_empty_or(article.volume, &record.volume),
            issue: if article.issue.trim().is_empty() {
                record.issue.clone()
            } else {
                Some(article.issue)
            },
            pages: non_empty_or(article.pages, &record.pages),
            doi,
            url,
            status: ExtractionStatus::Found,
            confidence: record.confidence.max(0.95),
            original_reference: record.original_reference.clone(),
            error: None,
        }
    }
}

fn non_empty_or(candidate: String, fallback: &str) -> String {
    if candidate.trim().is_empty() {
        fallback.to_string()
    } else {
        candidate
    }
}

#[async_trait]
impl Enricher for PubMedEnricher {
    async fn enrich(
        &self,
        record: &ReferenceRecord,
        request_id: &str,
    ) -> Result<Option<ReferenceRecord>, EnrichError> {
        let query = Self::build_query(record);
        if query.is_empty() {
            debug!("[{}] no usable fields for a PubMed query", request_id);
            return Ok(None);
        }

        info!("[{}] searching PubMed for: {}", request_id, query);
        let body = self.get_text(&self.search_url(&query), "esearch").await?;
        let ids = Self::parse_search_response(&body)?;

        let Some(pmid) = ids.first() else {
            debug!("[{}] no PubMed candidate for query", request_id);
            return Ok(None);
        };

        info!("[{}] fetching PubMed record {}", request_id, pmid);
        let xml = self.get_text(&self.fetch_url(pmid), "efetch").await?;

        let Some(article) = Self::parse_fetch_response(&xml)? else {
            debug!("[{}] efetch returned no article", request_id);
            return Ok(None);
        };

        if !Self::titles_match(&record.title, &article.title) {
            debug!(
                "[{}] candidate title too dissimilar, keeping extraction: {}",
                request_id, article.title
            );
            return Ok(None);
        }

        debug!("[{}] merging PubMed record over extraction", request_id);
        Ok(Some(Self::merge(record, article)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EFETCH_XML: &str = r#"<?xml version="1.0" ?>
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE" Owner="NLM">
      <PMID Version="1">32000000</PMID>
      <Article PubModel="Print">
        <Journal>
          <Title>Nature</Title>
          <JournalIssue CitedMedium="Print">
            <Volume>577</Volume>
            <Issue>7792</Issue>
            <PubDate>
              <Year>2020</Year>
            </PubDate>
          </JournalIssue>
        </Journal>
        <ArticleTitle>Deep learning</ArticleTitle>
        <Pagination>
          <MedlinePgn>641-646</MedlinePgn>
        </Pagination>
        <AuthorList CompleteYN="Y">
          <Author ValidYN="Y">
            <LastName>Smith</LastName>
            <Initials>J</Initials>
          </Author>
          <Author ValidYN="Y">
            <LastName>Doe</LastName>
            <Initials>A</Initials>
          </Author>
        </AuthorList>
      </Article>
    </MedlineCitation>
    <PubmedData>
      <ArticleIdList>
        <ArticleId IdType="pubmed">32000000</ArticleId>
        <ArticleId IdType="doi">10.1038/s41586-020-1942-4</ArticleId>
      </ArticleIdList>
    </PubmedData>
  </PubmedArticle>
</PubmedArticleSet>"#;

    fn extracted_record() -> ReferenceRecord {
        ReferenceRecord {
            title: "Deep learning".to_string(),
            authors: vec!["Smith J.".to_string()],
            year: Some(2020),
            confidence: 0.8,
            status: ExtractionStatus::Found,
            original_reference: "Smith J. Deep learning. Nature. 2020.".to_string(),
            ..ReferenceRecord::default()
        }
    }

    fn test_enricher(base_url: &str) -> PubMedEnricher {
        PubMedEnricher::new(PubMedConfig {
            base_url: base_url.to_string(),
            ..PubMedConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_build_query_title_and_year() {
        let record = extracted_record();
        assert_eq!(
            PubMedEnricher::build_query(&record),
            "Deep learning 2020"
        );

        let record = ReferenceRecord {
            title: "Deep learning".to_string(),
            ..ReferenceRecord::default()
        };
        assert_eq!(PubMedEnricher::build_query(&record), "Deep learning");

        let record = ReferenceRecord::default();
        assert_eq!(PubMedEnricher::build_query(&record), "");
    }

    #[test]
    fn test_search_url() {
        let enricher = test_enricher("https://eutils.ncbi.nlm.nih.gov/entrez/eutils");
        let url = enricher.search_url("deep learning 2020");

        assert!(url.starts_with("https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi?"));
        assert!(url.contains("db=pubmed"));
        assert!(url.contains("term=deep%20learning%202020"));
        assert!(url.contains("retmax=1"));
        assert!(url.contains("retmode=json"));
    }

    #[test]
    fn test_fetch_url() {
        let enricher = test_enricher("https://eutils.ncbi.nlm.nih.gov/entrez/eutils/");
        let url = enricher.fetch_url("32000000");

        assert!(url.starts_with("https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi?"));
        assert!(url.contains("id=32000000"));
        assert!(url.contains("retmode=xml"));
        assert!(url.contains("rettype=medline"));
    }

    #[test]
    fn test_parse_search_response() {
        let ids = PubMedEnricher::parse_search_response(
            r#"{"header":{"type":"esearch"},"esearchresult":{"count":"1","idlist":["32000000"]}}"#,
        )
        .unwrap();
        assert_eq!(ids, vec!["32000000".to_string()]);

        let ids = PubMedEnricher::parse_search_response(
            r#"{"esearchresult":{"count":"0","idlist":[]}}"#,
        )
        .unwrap();
        assert!(ids.is_empty());

        let ids = PubMedEnricher::parse_search_response("{}").unwrap();
        assert!(ids.is_empty());

        assert!(PubMedEnricher::parse_search_response("not json").is_err());
    }

    #[test]
    fn test_parse_fetch_response() {
        let article = PubMedEnricher::parse_fetch_response(EFETCH_XML)
            .unwrap()
            .unwrap();

        assert_eq!(article.title, "Deep learning");
        assert_eq!(
            article.authors,
            vec!["Smith J".to_string(), "Doe A".to_string()]
        );
        assert_eq!(article.year, Some(2020));
        assert_eq!(article.journal, "Nature");
        assert_eq!(article.volume, "577");
        assert_eq!(article.issue, "7792");
        assert_eq!(article.pages, "641-646");
        assert_eq!(article.doi, "10.1038/s41586-020-1942-4");
    }

    #[test]
    fn test_parse_fetch_response_empty_set() {
        let article =
            PubMedEnricher::parse_fetch_response("<PubmedArticleSet></PubmedArticleSet>").unwrap();
        assert!(article.is_none());
    }

    #[test]
    fn test_titles_match() {
        assert!(PubMedEnricher::titles_match("Deep learning", "Deep learning"));
        assert!(PubMedEnricher::titles_match(
            "Deep learning",
            "Deep Learning."
        ));
        assert!(!PubMedEnricher::titles_match(
            "Deep learning",
            "Gut microbiota in health and disease"
        ));
        // No extracted title to compare against
        assert!(PubMedEnricher::titles_match("", "anything at all"));
    }

    #[test]
    fn test_merge_overrides_and_backfills() {
        let record = ReferenceRecord {
            title: "Deep learning".to_string(),
            authors: vec!["Smith J.".to_string()],
            year: None,
            journal: String::new(),
            pages: "1-10".to_string(),
            confidence: 0.8,
            status: ExtractionStatus::Found,
            original_reference: "Smith J. Deep learning. Nature. 2020.".to_string(),
            ..ReferenceRecord::default()
        };
        let article = PubMedArticle {
            title: "Deep learning".to_string(),
            authors: vec!["Smith J".to_string(), "Doe A".to_string()],
            year: Some(2020),
            journal: "Nature".to_string(),
            volume: "577".to_string(),
            doi: "10.1038/s41586-020-1942-4".to_string(),
            ..PubMedArticle::default()
        };

        let merged = PubMedEnricher::merge(&record, article);

        assert_eq!(merged.journal, "Nature");
        assert_eq!(merged.year, Some(2020));
        assert_eq!(merged.authors.len(), 2);
        // Fetched record had no pages, extracted value survives
        assert_eq!(merged.pages, "1-10");
        assert_eq!(merged.doi, "10.1038/s41586-020-1942-4");
        assert_eq!(merged.url, "https://doi.org/10.1038/s41586-020-1942-4");
        assert_eq!(merged.confidence, 0.95);
        assert_eq!(merged.status, ExtractionStatus::Found);
        assert_eq!(
            merged.original_reference,
            "Smith J. Deep learning. Nature. 2020."
        );
    }

    #[test]
    fn test_merge_keeps_higher_confidence() {
        let record = ReferenceRecord {
            confidence: 0.99,
            ..extracted_record()
        };
        let merged = PubMedEnricher::merge(&record, PubMedArticle::default());
        assert_eq!(merged.confidence, 0.99);
    }

    #[tokio::test]
    async fn test_enrich_merges_candidate() {
        let mut server = mockito::Server::new_async().await;
        let _search = server
            .mock("GET", "/esearch.fcgi")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"esearchresult":{"idlist":["32000000"]}}"#)
            .create_async()
            .await;
        let _fetch = server
            .mock("GET", "/efetch.fcgi")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "text/xml")
            .with_body(EFETCH_XML)
            .create_async()
            .await;

        let enricher = test_enricher(&server.url());
        let merged = enricher
            .enrich(&extracted_record(), "REQ_TEST")
            .await
            .unwrap()
            .expect("candidate should merge");

        assert_eq!(merged.journal, "Nature");
        assert_eq!(merged.volume, "577");
        assert_eq!(merged.confidence, 0.95);
    }

    #[tokio::test]
    async fn test_enrich_no_candidate_is_none() {
        let mut server = mockito::Server::new_async().await;
        let _search = server
            .mock("GET", "/esearch.fcgi")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"esearchresult":{"idlist":[]}}"#)
            .create_async()
            .await;

        let enricher = test_enricher(&server.url());
        let result = enricher.enrich(&extracted_record(), "REQ_TEST").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_enrich_server_error_is_err() {
        let mut server = mockito::Server::new_async().await;
        let _search = server
            .mock("GET", "/esearch.fcgi")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let enricher = test_enricher(&server.url());
        let err = enricher
            .enrich(&extracted_record(), "REQ_TEST")
            .await
            .unwrap_err();
        assert!(matches!(err, EnrichError::Api(_)));
    }

    #[tokio::test]
    async fn test_enrich_dissimilar_title_is_none() {
        let mut server = mockito::Server::new_async().await;
        let _search = server
            .mock("GET", "/esearch.fcgi")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"esearchresult":{"idlist":["32000000"]}}"#)
            .create_async()
            .await;
        let _fetch = server
            .mock("GET", "/efetch.fcgi")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(EFETCH_XML)
            .create_async()
            .await;

        let record = ReferenceRecord {
            title: "Completely unrelated subject matter entirely".to_string(),
            status: ExtractionStatus::Found,
            confidence: 0.8,
            ..ReferenceRecord::default()
        };

        let enricher = test_enricher(&server.url());
        let result = enricher.enrich(&record, "REQ_TEST").await.unwrap();
        assert!(result.is_none());
    }
}
