use crate::records::GeoPoint;

pub struct NotificationTemplates;

impl NotificationTemplates {
    /// SMS body for an SOS broadcast. Kept short: a single segment with the
    /// user's name, a maps link, and the local time.
    pub fn sos_sms(user_name: &str, location: &GeoPoint) -> String {
        format!(
            "SAFE-PING+ ALERT! {} needs help! Location: https://maps.google.com/?q={},{} Time: {}",
            user_name,
            location.lat,
            location.lng,
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sos_sms_embeds_name_and_maps_link() {
        let body = NotificationTemplates::sos_sms(
            "Asha",
            &GeoPoint {
                lat: 12.9,
                lng: 77.6,
            },
        );
        assert!(body.contains("Asha needs help!"));
        assert!(body.contains("https://maps.google.com/?q=12.9,77.6"));
    }
}
