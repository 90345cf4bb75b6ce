use serde::Deserialize;

// Primary feed search response, trimmed to the fields in use:
// {
//   "result": [
//     {
//       "id": "stryktipset_4711",
//       "payload": {
//         "draw": {
//           "regCloseDescription": "Stryktipset v.11",
//           "regCloseTime": "2024-03-16T15:59:00+01:00",
//           "currentNetSale": "31245678,00",
//           "drawEvents": [
//             {
//               "match": { "participants": [{ "name": "Arsenal" }, { "name": "Chelsea" }] },
//               "odds": { "one": "1,85", "x": "3,60", "two": "4,20" },
//               "betMetrics": { "values": [{ "distribution": { "distribution": "61" } }, ...] }
//             }
//           ]
//         }
//       }
//     }
//   ]
// }

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub result: Option<Vec<SearchResult>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    pub id: Option<String>,
    pub payload: Option<Payload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Payload {
    pub draw: Option<Draw>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draw {
    pub reg_close_description: Option<String>,
    pub reg_close_time: Option<String>,
    pub current_net_sale: Option<String>,
    pub draw_events: Option<Vec<DrawEvent>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawEvent {
    #[serde(rename = "match")]
    pub fixture: Option<MatchInfo>,
    pub odds: Option<EventOdds>,
    pub bet_metrics: Option<BetMetrics>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchInfo {
    pub participants: Option<Vec<Participant>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Participant {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventOdds {
    pub one: Option<String>,
    pub x: Option<String>,
    pub two: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BetMetrics {
    pub values: Option<Vec<MetricValue>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricValue {
    pub distribution: Option<Distribution>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Distribution {
    pub distribution: Option<String>,
}

impl DrawEvent {
    pub fn participant(&self, idx: usize) -> Option<&str> {
        self.fixture
            .as_ref()?
            .participants
            .as_ref()?
            .get(idx)?
            .name
            .as_deref()
    }

    /// Crowd percentage string for outcome `idx`.
    pub fn distribution(&self, idx: usize) -> Option<&str> {
        self.bet_metrics
            .as_ref()?
            .values
            .as_ref()?
            .get(idx)?
            .distribution
            .as_ref()?
            .distribution
            .as_deref()
    }
}
