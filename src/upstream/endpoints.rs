use url::Url;

fn join(base: &Url, path: &str, query: Option<&str>) -> Url {
    let mut url = base.clone();
    url.set_path(path);
    url.set_query(query);
    url
}

/// The three antigravity v1internal endpoints this gateway calls.
#[derive(Debug, Clone)]
pub struct UpstreamEndpoints {
    stream: Url,
    unary: Url,
    model_list: Url,
}

impl UpstreamEndpoints {
    pub fn new(base: &Url) -> Self {
        Self {
            stream: join(base, "/v1internal:streamGenerateContent", Some("alt=sse")),
            unary: join(base, "/v1internal:generateContent", None),
            model_list: join(base, "/v1internal:listModels", None),
        }
    }

    pub fn select(&self, stream: bool) -> &Url {
        if stream { &self.stream } else { &self.unary }
    }

    pub fn model_list(&self) -> &Url {
        &self.model_list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_returns_the_right_endpoint() {
        let base = Url::parse("https://daily-cloudcode-pa.sandbox.googleapis.com").unwrap();
        let endpoints = UpstreamEndpoints::new(&base);
        assert!(endpoints.select(true).as_str().contains("stream"));
        assert!(!endpoints.select(false).as_str().contains("stream"));
    }
}
