use url::Url;

/// Hide the password of a connection string before printing it
pub fn mask_database_url(url_str: &str) -> String {
    match Url::parse(url_str) {
        Ok(mut url) if url.password().is_some() => {
            if url.set_password(Some("****")).is_err() {
                return url_str.to_string();
            }
            url.to_string()
        }
        Ok(url) => url.to_string(),
        Err(_) => url_str.to_string(),
    }
}
