//! Flattening of upstream records into the station schema.

use super::{ConnectionRecord, StationRecord, UpstreamConnection, UpstreamStation};

/// Label used when the upstream omits an operator, a status, or a
/// connector type name.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Title given to stations the upstream left unnamed.
pub const UNNAMED_STATION: &str = "Unnamed Station";

/// Map one upstream record to the flat station shape. Every documented
/// default is applied here and nowhere else.
pub fn normalize_station(raw: UpstreamStation) -> StationRecord {
    let address = raw.address_info.unwrap_or_default();
    let country = address.country.unwrap_or_default();
    let operator = raw.operator_info.unwrap_or_default();
    let status = raw.status_type.unwrap_or_default();

    StationRecord {
        id: raw.id.unwrap_or_default(),
        uuid: raw.uuid.unwrap_or_default(),
        title: address
            .title
            .unwrap_or_else(|| UNNAMED_STATION.to_string()),
        address: address.address_line1.unwrap_or_default(),
        town: address.town.unwrap_or_default(),
        state: address.state_or_province.unwrap_or_default(),
        postcode: address.postcode.unwrap_or_default(),
        country: country.title.unwrap_or_default(),
        country_code: country.iso_code.unwrap_or_default(),
        latitude: address.latitude,
        longitude: address.longitude,
        operator: operator
            .title
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
        operator_website: operator.website_url,
        usage_cost: raw.usage_cost,
        num_points: raw.number_of_points.unwrap_or(1),
        connections: raw
            .connections
            .unwrap_or_default()
            .into_iter()
            .map(normalize_connection)
            .collect(),
        status: status.title.unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
        is_operational: status.is_operational.unwrap_or(true),
        date_last_verified: raw.date_last_verified,
        date_created: raw.date_created,
    }
}

fn normalize_connection(raw: UpstreamConnection) -> ConnectionRecord {
    ConnectionRecord {
        id: raw.id.unwrap_or_default(),
        connection_type: raw
            .connection_type
            .and_then(|t| t.title)
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
        power_kw: raw.power_kw,
        current_type: raw.current_type.and_then(|t| t.title),
        quantity: raw.quantity.unwrap_or(1),
        status: raw
            .status_type
            .and_then(|s| s.title)
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_RECORD: &str = r#"{
        "ID": 187047,
        "UUID": "9A0E2A3F-1B77-4F2B-8C29-0B1C6C9E0F0B",
        "AddressInfo": {
            "Title": "Shopping Morumbi",
            "AddressLine1": "Av. Roque Petroni Junior, 1089",
            "Town": "Sao Paulo",
            "StateOrProvince": "SP",
            "Postcode": "04707-900",
            "Country": { "Title": "Brazil", "ISOCode": "BR" },
            "Latitude": -23.622661,
            "Longitude": -46.698018
        },
        "OperatorInfo": { "Title": "Tupinamba Energia", "WebsiteURL": "https://tupi.mobi" },
        "UsageCost": "R$1,50/kWh",
        "NumberOfPoints": 4,
        "Connections": [
            {
                "ID": 261849,
                "ConnectionType": { "Title": "Type 2 (Socket Only)" },
                "PowerKW": 22.0,
                "CurrentType": { "Title": "AC (Three-Phase)" },
                "Quantity": 2,
                "StatusType": { "Title": "Operational", "IsOperational": true }
            }
        ],
        "StatusType": { "Title": "Operational", "IsOperational": true },
        "DateLastVerified": "2024-11-02T09:00:00Z",
        "DateCreated": "2019-06-14T12:30:00Z"
    }"#;

    #[test]
    fn test_full_record_maps_through() {
        let raw: UpstreamStation = serde_json::from_str(FULL_RECORD).unwrap();
        let station = normalize_station(raw);

        assert_eq!(station.id, 187047);
        assert_eq!(station.title, "Shopping Morumbi");
        assert_eq!(station.town, "Sao Paulo");
        assert_eq!(station.country_code, "BR");
        assert_eq!(station.latitude, Some(-23.622661));
        assert_eq!(station.operator, "Tupinamba Energia");
        assert_eq!(station.operator_website.as_deref(), Some("https://tupi.mobi"));
        assert_eq!(station.num_points, 4);
        assert_eq!(station.status, "Operational");
        assert!(station.is_operational);

        let connection = &station.connections[0];
        assert_eq!(connection.connection_type, "Type 2 (Socket Only)");
        assert_eq!(connection.power_kw, Some(22.0));
        assert_eq!(connection.quantity, 2);
    }

    #[test]
    fn test_empty_record_gets_every_default() {
        let raw: UpstreamStation = serde_json::from_str("{}").unwrap();
        let station = normalize_station(raw);

        assert_eq!(station.id, 0);
        assert_eq!(station.title, UNNAMED_STATION);
        assert_eq!(station.operator, UNKNOWN_LABEL);
        assert_eq!(station.status, UNKNOWN_LABEL);
        assert_eq!(station.num_points, 1);
        assert!(station.is_operational);
        assert!(station.connections.is_empty());
        assert!(station.latitude.is_none());
        assert!(station.longitude.is_none());
        assert_eq!(station.country, "");
        assert_eq!(station.country_code, "");
    }

    #[test]
    fn test_missing_operator_info_uses_unknown_label() {
        let raw: UpstreamStation = serde_json::from_str(
            r#"{"ID": 1, "AddressInfo": {"Title": "Posto Central"}}"#,
        )
        .unwrap();
        let station = normalize_station(raw);
        assert_eq!(station.operator, UNKNOWN_LABEL);
        assert!(station.operator_website.is_none());
    }

    #[test]
    fn test_missing_number_of_points_defaults_to_one() {
        let raw: UpstreamStation =
            serde_json::from_str(r#"{"ID": 2, "Connections": []}"#).unwrap();
        let station = normalize_station(raw);
        assert_eq!(station.num_points, 1);
    }

    #[test]
    fn test_null_connections_become_empty_list() {
        let raw: UpstreamStation =
            serde_json::from_str(r#"{"ID": 3, "Connections": null}"#).unwrap();
        let station = normalize_station(raw);
        assert!(station.connections.is_empty());
    }

    #[test]
    fn test_sparse_connection_gets_defaults() {
        let raw: UpstreamStation = serde_json::from_str(
            r#"{"ID": 4, "Connections": [{"ID": 99}]}"#,
        )
        .unwrap();
        let station = normalize_station(raw);

        let connection = &station.connections[0];
        assert_eq!(connection.id, 99);
        assert_eq!(connection.connection_type, UNKNOWN_LABEL);
        assert_eq!(connection.quantity, 1);
        assert_eq!(connection.status, UNKNOWN_LABEL);
        assert!(connection.power_kw.is_none());
        assert!(connection.current_type.is_none());
    }

    #[test]
    fn test_non_operational_status_is_preserved() {
        let raw: UpstreamStation = serde_json::from_str(
            r#"{"ID": 5, "StatusType": {"Title": "Temporarily Unavailable", "IsOperational": false}}"#,
        )
        .unwrap();
        let station = normalize_station(raw);
        assert_eq!(station.status, "Temporarily Unavailable");
        assert!(!station.is_operational);
    }

    #[test]
    fn test_station_record_serializes_camel_case() {
        let raw: UpstreamStation = serde_json::from_str("{}").unwrap();
        let value = serde_json::to_value(normalize_station(raw)).unwrap();
        assert_eq!(value["numPoints"], 1);
        assert_eq!(value["isOperational"], true);
        assert!(value["countryCode"].is_string());
    }
}
