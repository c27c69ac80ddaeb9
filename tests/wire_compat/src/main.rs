fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use reupload_protocol::{
        Cookie, ReUploadRequest, ReUploadResponse, SsoResponse, cookie_header,
        parse_cookie_header,
    };

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Normalizes JSON values so that integer-valued floats compare equal.
    ///
    /// Browsers send `expires: -1`, Rust serializes the `f64` as `-1.0`.
    fn normalize_value(v: &serde_json::Value) -> serde_json::Value {
        match v {
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => serde_json::json!(f),
                None => v.clone(),
            },
            serde_json::Value::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), normalize_value(v)))
                    .collect(),
            ),
            serde_json::Value::Array(arr) => {
                serde_json::Value::Array(arr.iter().map(normalize_value).collect())
            }
            _ => v.clone(),
        }
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values (order-independent, float-normalized comparison).
    fn roundtrip_test<T>(name: &str) -> T
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));

        assert_eq!(
            normalize_value(&fixture),
            normalize_value(&reserialized),
            "roundtrip mismatch for {name}:\n  wire: {fixture}\n  Rust: {reserialized}"
        );
        parsed
    }

    #[test]
    fn fixture_sso_response() {
        let sso: SsoResponse = roundtrip_test("sso_response.json");
        assert!(sso.url.starts_with("https://forum.cfx.re/session/sso_login?"));
    }

    #[test]
    fn fixture_re_upload_request() {
        let req: ReUploadRequest = roundtrip_test("re_upload_request.json");
        assert_eq!(req.chunk_count, 3);
        assert_eq!(req.total_size, 2500);
    }

    #[test]
    fn fixture_re_upload_request_field_order() {
        let req = ReUploadRequest {
            chunk_count: 3,
            chunk_size: 1024,
            name: "my-resource.zip".into(),
            original_file_name: "my-resource.zip".into(),
            total_size: 2500,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(
            json,
            r#"{"chunk_count":3,"chunk_size":1024,"name":"my-resource.zip","original_file_name":"my-resource.zip","total_size":2500}"#
        );
    }

    #[test]
    fn fixture_re_upload_response_ok() {
        let resp: ReUploadResponse = roundtrip_test("re_upload_response_ok.json");
        assert!(resp.errors().is_none());
        assert!(resp.is_accepted());
        assert_eq!(resp.asset_id, serde_json::json!(12345));
    }

    #[test]
    fn fixture_re_upload_response_errors() {
        let resp: ReUploadResponse = roundtrip_test("re_upload_response_errors.json");
        let errors = resp.errors().expect("errors should be reported");
        assert_eq!(errors[0]["field"], "total_size");
        assert!(!resp.is_accepted());
    }

    #[test]
    fn fixture_session_cookie() {
        let cookie: Cookie = roundtrip_test("session_cookie.json");
        assert_eq!(
            cookie,
            Cookie::forum_session("d41d8cd98f00b204e9800998ecf8427e", "forum.cfx.re")
        );
        assert!(cookie.is_persistent_without_expiry());
    }

    #[test]
    fn fixture_get_all_cookies_to_header() {
        #[derive(serde::Deserialize)]
        struct GetAllCookies {
            cookies: Vec<Cookie>,
        }

        let result: GetAllCookies =
            serde_json::from_value(load_fixture("get_all_cookies_result.json")).unwrap();
        assert_eq!(result.cookies.len(), 3);
        assert!(result.cookies[1].session);
        assert_eq!(result.cookies[2].expires, 1798761600.5);

        let header = cookie_header(&result.cookies);
        assert_eq!(
            header,
            "_t=d41d8cd98f00b204e9800998ecf8427e; _forum_session=Zm9ydW0tc2Vzc2lvbg; portal_token=eyJhbGciOiJIUzI1NiJ9.e30.sig"
        );

        let pairs = parse_cookie_header(&header);
        let names: Vec<&str> = pairs.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["_t", "_forum_session", "portal_token"]);
        assert_eq!(pairs[2].1, "eyJhbGciOiJIUzI1NiJ9.e30.sig");
    }
}
