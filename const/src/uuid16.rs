uuid16_enum! {
    /// GATT services ([Assigned Numbers] Section 3.4).
    pub enum Service {
        GenericAccess = 0x1800,
        GenericAttribute = 0x1801,
        ImmediateAlert = 0x1802,
        LinkLoss = 0x1803,
        TxPower = 0x1804,
        CurrentTime = 0x1805,
        HealthThermometer = 0x1809,
        DeviceInformation = 0x180A,
        HeartRate = 0x180D,
        Battery = 0x180F,
        BloodPressure = 0x1810,
        HumanInterfaceDevice = 0x1812,
        RunningSpeedAndCadence = 0x1814,
        CyclingSpeedAndCadence = 0x1816,
        EnvironmentalSensing = 0x181A,
        Glucose = 0x1808,
    }
}

uuid16_enum! {
    /// GATT attribute types ([Assigned Numbers] Section 3.5).
    pub enum Declaration {
        PrimaryService = 0x2800,
        SecondaryService = 0x2801,
        Include = 0x2802,
        Characteristic = 0x2803,
    }
}

uuid16_enum! {
    /// GATT characteristic descriptors ([Assigned Numbers] Section 3.7).
    pub enum Descriptor {
        CharacteristicExtendedProperties = 0x2900,
        CharacteristicUserDescription = 0x2901,
        ClientCharacteristicConfiguration = 0x2902,
        ServerCharacteristicConfiguration = 0x2903,
        CharacteristicPresentationFormat = 0x2904,
        CharacteristicAggregateFormat = 0x2905,
        ValidRange = 0x2906,
        ReportReference = 0x2908,
    }
}

uuid16_enum! {
    /// GATT characteristics ([Assigned Numbers] Section 3.8).
    pub enum Characteristic {
        DeviceName = 0x2A00,
        Appearance = 0x2A01,
        ServiceChanged = 0x2A05,
        AlertLevel = 0x2A06,
        TxPowerLevel = 0x2A07,
        BatteryLevel = 0x2A19,
        ModelNumberString = 0x2A24,
        SerialNumberString = 0x2A25,
        FirmwareRevisionString = 0x2A26,
        ManufacturerNameString = 0x2A29,
        CurrentTime = 0x2A2B,
        BloodPressureMeasurement = 0x2A35,
        HeartRateMeasurement = 0x2A37,
        BodySensorLocation = 0x2A38,
        HeartRateControlPoint = 0x2A39,
        BootKeyboardInputReport = 0x2A22,
        Report = 0x2A4D,
        RscMeasurement = 0x2A53,
        CscMeasurement = 0x2A5B,
        Temperature = 0x2A6E,
        Humidity = 0x2A6F,
        GlucoseMeasurement = 0x2A18,
        ClientSupportedFeatures = 0x2B29,
        DatabaseHash = 0x2B2A,
    }
}
